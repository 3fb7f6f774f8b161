use anchor_lang::prelude::*;

use crate::constants::NO_LEVERAGE;
use crate::errors::LendingError;

/// Tracks a farming ticket staked in the AMM on behalf of a position.
///
/// The ticket itself is owned by a PDA whose seeds identify the position.
/// Those seeds contain the leverage, so receipts are what clients filter on
/// to find open positions.
#[account]
#[derive(InitSpace)]
pub struct FarmingReceipt {
    /// Obligation for leveraged positions, caller wallet for vaults
    pub owner: Pubkey,

    /// Borrow reserve for leveraged positions, AMM pool for vaults
    pub association: Pubkey,

    /// Farming ticket this receipt stands for
    pub ticket: Pubkey,

    /// Leverage in percent, 100 for vaults
    pub leverage: u64,
}

impl FarmingReceipt {
    pub fn is_for(&self, owner: &Pubkey, association: &Pubkey, ticket: &Pubkey) -> bool {
        self.owner == *owner && self.association == *association && self.ticket == *ticket
    }

    /// Signer seeds of a leveraged position's ticket owner PDA
    /// PDA Seeds: [lending_market, obligation, reserve, leverage LE]
    pub fn leveraged_owner_seeds<'a>(
        lending_market: &'a Pubkey,
        obligation: &'a Pubkey,
        reserve: &'a Pubkey,
        leverage: &'a [u8; 8],
        bump: &'a [u8; 1],
    ) -> [&'a [u8]; 5] {
        [
            lending_market.as_ref(),
            obligation.as_ref(),
            reserve.as_ref(),
            leverage,
            bump,
        ]
    }

    /// Signer seeds of a vault position's ticket owner PDA
    /// PDA Seeds: [owner, pool]
    pub fn vault_owner_seeds<'a>(
        owner: &'a Pubkey,
        pool: &'a Pubkey,
        bump: &'a [u8; 1],
    ) -> [&'a [u8]; 3] {
        [owner.as_ref(), pool.as_ref(), bump]
    }
}

/// Position a farming ticket owner PDA stands for, recovered from the
/// signer seeds the admin bot passes to `compound_position`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TicketOwner {
    Leveraged {
        lending_market: Pubkey,
        obligation: Pubkey,
        reserve: Pubkey,
        leverage: u64,
    },
    Vault {
        owner: Pubkey,
        pool: Pubkey,
    },
}

impl TicketOwner {
    /// Seed count, bump included, of a leveraged ticket owner
    pub const LEVERAGED_SEEDS_LEN: usize = 5;

    /// Seed count, bump included, of a vault ticket owner
    pub const VAULT_SEEDS_LEN: usize = 3;

    pub fn from_seeds(seeds: &[Vec<u8>]) -> Result<Self> {
        match seeds.len() {
            Self::LEVERAGED_SEEDS_LEN => {
                let leverage: [u8; 8] = seeds[3].as_slice().try_into().map_err(|_| {
                    msg!("Leverage seed must be 8 bytes");
                    error!(LendingError::InvalidArgument)
                })?;
                Ok(Self::Leveraged {
                    lending_market: seed_key(&seeds[0])?,
                    obligation: seed_key(&seeds[1])?,
                    reserve: seed_key(&seeds[2])?,
                    leverage: u64::from_le_bytes(leverage),
                })
            }
            Self::VAULT_SEEDS_LEN => Ok(Self::Vault {
                owner: seed_key(&seeds[0])?,
                pool: seed_key(&seeds[1])?,
            }),
            len => {
                msg!("Farming ticket owner cannot have {} seeds", len);
                err!(LendingError::InvalidArgument)
            }
        }
    }

    /// Compound fee in percent which applies to this kind of position
    pub fn compound_fee(&self, leveraged_fee: u8, vault_fee: u8) -> u8 {
        match self {
            Self::Leveraged { .. } => leveraged_fee,
            Self::Vault { .. } => vault_fee,
        }
    }

    /// Receipt for a new farming ticket of this position
    pub fn receipt(&self, ticket: Pubkey) -> FarmingReceipt {
        match *self {
            Self::Leveraged {
                obligation,
                reserve,
                leverage,
                ..
            } => FarmingReceipt {
                owner: obligation,
                association: reserve,
                ticket,
                leverage,
            },
            Self::Vault { owner, pool } => FarmingReceipt {
                owner,
                association: pool,
                ticket,
                leverage: NO_LEVERAGE,
            },
        }
    }
}

fn seed_key(seed: &[u8]) -> Result<Pubkey> {
    Pubkey::try_from(seed).map_err(|_| {
        msg!("Seed is not a public key");
        error!(LendingError::InvalidArgument)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leveraged_seeds() {
        let market = Pubkey::new_unique();
        let obligation = Pubkey::new_unique();
        let reserve = Pubkey::new_unique();
        let ticket = Pubkey::new_unique();
        let seeds = vec![
            market.to_bytes().to_vec(),
            obligation.to_bytes().to_vec(),
            reserve.to_bytes().to_vec(),
            300u64.to_le_bytes().to_vec(),
            vec![254],
        ];

        let owner = TicketOwner::from_seeds(&seeds).unwrap();
        assert_eq!(
            owner,
            TicketOwner::Leveraged {
                lending_market: market,
                obligation,
                reserve,
                leverage: 300,
            }
        );
        assert_eq!(owner.compound_fee(5, 10), 5);

        let receipt = owner.receipt(ticket);
        assert!(receipt.is_for(&obligation, &reserve, &ticket));
        assert_eq!(receipt.leverage, 300);
    }

    #[test]
    fn vault_seeds() {
        let caller = Pubkey::new_unique();
        let pool = Pubkey::new_unique();
        let ticket = Pubkey::new_unique();
        let seeds = vec![caller.to_bytes().to_vec(), pool.to_bytes().to_vec(), vec![255]];

        let owner = TicketOwner::from_seeds(&seeds).unwrap();
        assert_eq!(owner.compound_fee(5, 10), 10);

        let receipt = owner.receipt(ticket);
        assert!(receipt.is_for(&caller, &pool, &ticket));
        assert_eq!(receipt.leverage, NO_LEVERAGE);
    }

    #[test]
    fn malformed_seeds_are_rejected() {
        let key = Pubkey::new_unique().to_bytes().to_vec();
        assert_eq!(
            TicketOwner::from_seeds(&[key.clone(), key.clone()]).unwrap_err(),
            LendingError::InvalidArgument.into()
        );
        assert_eq!(
            TicketOwner::from_seeds(&[key.clone(), vec![1, 2, 3], vec![1]]).unwrap_err(),
            LendingError::InvalidArgument.into()
        );
        assert_eq!(
            TicketOwner::from_seeds(&[key.clone(), key.clone(), key, vec![1], vec![1]])
                .unwrap_err(),
            LendingError::InvalidArgument.into()
        );
    }
}
