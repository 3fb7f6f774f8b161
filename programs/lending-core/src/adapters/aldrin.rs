use std::ops::Not;

use anchor_lang::prelude::*;
use anchor_lang::solana_program::instruction::Instruction;
use anchor_lang::solana_program::program::invoke_signed;

use crate::adapters::{AmmPool, SplTokenLedger, TokenLedger};
use crate::errors::LendingError;
use crate::math::{Decimal, TryAdd, TryDiv, TryMul};

// ============================================================================
// WIRE FORMAT
// ============================================================================

/// Size of an Aldrin pool account including its 8 byte discriminator
pub const ALDRIN_POOL_ACCOUNT_SIZE: usize = 441;

/// Instructions of the Aldrin AMM this program calls.
/// Encoded as an 8 byte prefix followed by little endian arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AldrinInstruction {
    Swap {
        tokens: u64,
        min_tokens: u64,
        side: Side,
    },
    CreateBasket {
        creation_size: u64,
        base_token_used_max: u64,
        quote_token_used_max: u64,
    },
    StartFarming {
        pool_token_amount: u64,
    },
    EndFarming,
    RedeemBasket {
        redemption_size: u64,
        base_token_returned_min: u64,
        quote_token_returned_min: u64,
    },
    WithdrawFarmed,
}

impl AldrinInstruction {
    pub fn prefix(&self) -> [u8; 8] {
        match self {
            Self::Swap { .. } => [248, 198, 158, 145, 225, 117, 135, 200],
            Self::CreateBasket { .. } => [47, 105, 155, 148, 15, 169, 202, 211],
            Self::StartFarming { .. } => [150, 205, 185, 109, 97, 202, 68, 110],
            Self::EndFarming => [49, 90, 68, 217, 222, 198, 89, 21],
            Self::RedeemBasket { .. } => [37, 133, 222, 57, 189, 160, 151, 41],
            Self::WithdrawFarmed => [175, 95, 99, 74, 63, 66, 237, 61],
        }
    }

    pub fn data(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(8 + 3 * 8);
        data.extend_from_slice(&self.prefix());

        match *self {
            Self::Swap {
                tokens,
                min_tokens,
                side,
            } => {
                data.extend_from_slice(&tokens.to_le_bytes());
                data.extend_from_slice(&min_tokens.to_le_bytes());
                data.push(side as u8);
            }
            Self::CreateBasket {
                creation_size,
                base_token_used_max,
                quote_token_used_max,
            } => {
                data.extend_from_slice(&creation_size.to_le_bytes());
                data.extend_from_slice(&base_token_used_max.to_le_bytes());
                data.extend_from_slice(&quote_token_used_max.to_le_bytes());
            }
            Self::StartFarming { pool_token_amount } => {
                data.extend_from_slice(&pool_token_amount.to_le_bytes());
            }
            Self::RedeemBasket {
                redemption_size,
                base_token_returned_min,
                quote_token_returned_min,
            } => {
                data.extend_from_slice(&redemption_size.to_le_bytes());
                data.extend_from_slice(&base_token_returned_min.to_le_bytes());
                data.extend_from_slice(&quote_token_returned_min.to_le_bytes());
            }
            Self::EndFarming | Self::WithdrawFarmed => {}
        }

        data
    }
}

/// Direction of a swap, seen from the pool's order book
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// Quote tokens are sold for base tokens
    Bid = 0,
    /// Base tokens are sold for quote tokens
    Ask = 1,
}

impl Not for Side {
    type Output = Self;

    fn not(self) -> Self {
        match self {
            Self::Bid => Self::Ask,
            Self::Ask => Self::Bid,
        }
    }
}

impl Side {
    /// Side which sells tokens of `mint`
    pub fn for_mint(mint: &Pubkey, pool: &AldrinPool) -> Result<Self> {
        if *mint == pool.base_token_mint {
            Ok(Self::Ask)
        } else if *mint == pool.quote_token_mint {
            Ok(Self::Bid)
        } else {
            msg!(
                "The reserve's liquidity mint must match either \
                the base token mint or the quote token mint of the pool"
            );
            err!(LendingError::InvalidAccountInput)
        }
    }
}

/// Leading fields of an Aldrin pool account
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AldrinPool {
    pub lp_token_freeze_vault: Pubkey,
    pub pool_mint: Pubkey,
    pub base_token_vault: Pubkey,
    pub base_token_mint: Pubkey,
    pub quote_token_vault: Pubkey,
    pub quote_token_mint: Pubkey,
}

impl AldrinPool {
    pub fn load(data: &[u8]) -> Result<Self> {
        if data.len() != ALDRIN_POOL_ACCOUNT_SIZE {
            msg!(
                "AMM pool account must be {} bytes, but got {}",
                ALDRIN_POOL_ACCOUNT_SIZE,
                data.len()
            );
            return err!(LendingError::InvalidAmmPool);
        }

        let key = |index: usize| {
            let start = 8 + index * 32;
            let mut bytes = [0u8; 32];
            bytes.copy_from_slice(&data[start..start + 32]);
            Pubkey::new_from_array(bytes)
        };

        Ok(Self {
            lp_token_freeze_vault: key(0),
            pool_mint: key(1),
            base_token_vault: key(2),
            base_token_mint: key(3),
            quote_token_vault: key(4),
            quote_token_mint: key(5),
        })
    }
}

impl AldrinPool {
    /// Mint of the tokens held by one of the pool's two vaults
    pub fn vault_mint(&self, vault: &Pubkey) -> Result<Pubkey> {
        if *vault == self.base_token_vault {
            Ok(self.base_token_mint)
        } else if *vault == self.quote_token_vault {
            Ok(self.quote_token_mint)
        } else {
            msg!("{} is neither the base nor the quote vault of the pool", vault);
            err!(LendingError::InvalidAmmPool)
        }
    }
}

/// Price of one LP token given the value of each vault
pub fn lp_token_market_price(
    lp_token_supply: u64,
    base_vault_value: Decimal,
    quote_vault_value: Decimal,
) -> Result<Decimal> {
    base_vault_value
        .try_add(quote_vault_value)?
        .try_div(lp_token_supply)
}

/// Price of one whole LP token of a non stable pool, where both vaults are
/// worth the same. `vault_token_price` is the price of one whole token held
/// by the vault.
pub fn unstable_lp_token_market_price(
    lp_token_supply: u64,
    lp_token_decimals: u8,
    vault_amount: u64,
    vault_decimals: u8,
    vault_token_price: Decimal,
) -> Result<Decimal> {
    let scaler = |decimals: u8| {
        10u64
            .checked_pow(decimals as u32)
            .ok_or_else(|| error!(LendingError::MathOverflow))
    };

    let vault_value = vault_token_price
        .try_mul(vault_amount)?
        .try_div(scaler(vault_decimals)?)?
        .try_mul(scaler(lp_token_decimals)?)?;

    lp_token_market_price(lp_token_supply, vault_value, vault_value)
}

// ============================================================================
// CPI
// ============================================================================

/// Accounts an `AldrinAmm` may pass to the AMM. Each instruction fails with
/// `InvalidAccountInput` if an account it needs is missing.
#[derive(Default, Clone)]
pub struct AldrinAccounts<'info> {
    pub pool: Option<AccountInfo<'info>>,
    pub pool_signer: Option<AccountInfo<'info>>,
    pub pool_mint: Option<AccountInfo<'info>>,
    pub base_token_vault: Option<AccountInfo<'info>>,
    pub quote_token_vault: Option<AccountInfo<'info>>,
    pub fee_pool_wallet: Option<AccountInfo<'info>>,
    pub fee_base_wallet: Option<AccountInfo<'info>>,
    pub fee_quote_wallet: Option<AccountInfo<'info>>,
    pub lp_token_freeze_vault: Option<AccountInfo<'info>>,
    pub farming_state: Option<AccountInfo<'info>>,
    pub farming_ticket: Option<AccountInfo<'info>>,
    pub farming_snapshots: Option<AccountInfo<'info>>,
    pub farming_calc: Option<AccountInfo<'info>>,
    pub farm_token_vault: Option<AccountInfo<'info>>,
    /// Transaction signer owning the user wallets
    pub user: Option<AccountInfo<'info>>,
    pub user_base_wallet: Option<AccountInfo<'info>>,
    pub user_quote_wallet: Option<AccountInfo<'info>>,
    pub user_lp_wallet: Option<AccountInfo<'info>>,
    pub user_farm_wallet: Option<AccountInfo<'info>>,
    pub user_sol_wallet: Option<AccountInfo<'info>>,
    /// PDA owning the farming ticket, signs with the amm signer seeds
    pub ticket_owner: Option<AccountInfo<'info>>,
    pub token_program: Option<AccountInfo<'info>>,
    pub clock: Option<AccountInfo<'info>>,
    pub rent: Option<AccountInfo<'info>>,
}

fn required<'info>(account: &Option<AccountInfo<'info>>, name: &str) -> Result<AccountInfo<'info>> {
    account.clone().ok_or_else(|| {
        msg!("Missing AMM account '{}'", name);
        error!(LendingError::InvalidAccountInput)
    })
}

macro_rules! metas {
    ($accounts:expr; $($field:ident: $writable:expr, $signer:expr),+ $(,)?) => {
        vec![$(
            (required(&$accounts.$field, stringify!($field))?, $writable, $signer)
        ),+]
    };
}

/// Aldrin AMM reached through CPI. The ticket owner PDA signs with
/// `signer_seeds`.
pub struct AldrinAmm<'a, 'info> {
    program: AccountInfo<'info>,
    accounts: AldrinAccounts<'info>,
    signer_seeds: &'a [&'a [&'a [u8]]],
}

impl<'a, 'info> AldrinAmm<'a, 'info> {
    pub fn new(
        program: AccountInfo<'info>,
        accounts: AldrinAccounts<'info>,
        signer_seeds: &'a [&'a [&'a [u8]]],
    ) -> Self {
        Self {
            program,
            accounts,
            signer_seeds,
        }
    }

    fn invoke(
        &self,
        instruction: AldrinInstruction,
        accounts: Vec<(AccountInfo<'info>, bool, bool)>,
    ) -> Result<()> {
        let metas = accounts
            .iter()
            .map(|(info, writable, signer)| {
                if *writable {
                    AccountMeta::new(*info.key, *signer)
                } else {
                    AccountMeta::new_readonly(*info.key, *signer)
                }
            })
            .collect();

        let ix = Instruction {
            program_id: *self.program.key,
            accounts: metas,
            data: instruction.data(),
        };

        let mut infos: Vec<AccountInfo<'info>> =
            accounts.into_iter().map(|(info, _, _)| info).collect();
        infos.push(self.program.clone());

        invoke_signed(&ix, &infos, self.signer_seeds)?;
        Ok(())
    }
}

impl AmmPool for AldrinAmm<'_, '_> {
    fn swap(&mut self, tokens: u64, min_tokens: u64, side: Side) -> Result<()> {
        let accounts = metas!(self.accounts;
            pool: false, false,
            pool_signer: false, false,
            pool_mint: true, false,
            base_token_vault: true, false,
            quote_token_vault: true, false,
            fee_pool_wallet: true, false,
            user: false, true,
            user_base_wallet: true, false,
            user_quote_wallet: true, false,
            token_program: false, false,
        );
        self.invoke(
            AldrinInstruction::Swap {
                tokens,
                min_tokens,
                side,
            },
            accounts,
        )
    }

    fn create_basket(&mut self, lp_tokens: u64, base_max: u64, quote_max: u64) -> Result<()> {
        let accounts = metas!(self.accounts;
            pool: false, false,
            pool_mint: true, false,
            pool_signer: false, false,
            user_base_wallet: true, false,
            user_quote_wallet: true, false,
            base_token_vault: true, false,
            quote_token_vault: true, false,
            user_lp_wallet: true, false,
            user: false, true,
            token_program: false, false,
            clock: false, false,
            rent: false, false,
        );
        self.invoke(
            AldrinInstruction::CreateBasket {
                creation_size: lp_tokens,
                base_token_used_max: base_max,
                quote_token_used_max: quote_max,
            },
            accounts,
        )
    }

    fn start_farming(&mut self, lp_tokens: u64) -> Result<()> {
        let accounts = metas!(self.accounts;
            pool: false, false,
            farming_state: false, false,
            farming_ticket: true, false,
            lp_token_freeze_vault: true, false,
            user_lp_wallet: true, false,
            user: false, true,
            ticket_owner: false, true,
            token_program: false, false,
            clock: false, false,
            rent: false, false,
        );
        self.invoke(
            AldrinInstruction::StartFarming {
                pool_token_amount: lp_tokens,
            },
            accounts,
        )
    }

    fn end_farming(&mut self) -> Result<()> {
        let accounts = metas!(self.accounts;
            pool: false, false,
            farming_state: false, false,
            farming_snapshots: false, false,
            farming_ticket: true, false,
            lp_token_freeze_vault: true, false,
            pool_signer: false, false,
            user_lp_wallet: true, false,
            ticket_owner: false, true,
            token_program: false, false,
            clock: false, false,
            rent: false, false,
        );
        self.invoke(AldrinInstruction::EndFarming, accounts)
    }

    fn redeem_basket(&mut self, lp_tokens: u64, base_min: u64, quote_min: u64) -> Result<()> {
        let accounts = metas!(self.accounts;
            pool: false, false,
            pool_mint: true, false,
            base_token_vault: true, false,
            quote_token_vault: true, false,
            pool_signer: false, false,
            user_lp_wallet: true, false,
            user_base_wallet: true, false,
            user_quote_wallet: true, false,
            user: false, true,
            user_sol_wallet: true, false,
            token_program: false, false,
            fee_base_wallet: true, false,
            fee_quote_wallet: true, false,
            clock: false, false,
        );
        self.invoke(
            AldrinInstruction::RedeemBasket {
                redemption_size: lp_tokens,
                base_token_returned_min: base_min,
                quote_token_returned_min: quote_min,
            },
            accounts,
        )
    }

    fn withdraw_farmed(&mut self) -> Result<()> {
        let accounts = metas!(self.accounts;
            pool: false, false,
            farming_state: false, false,
            farming_calc: true, false,
            farm_token_vault: true, false,
            pool_signer: false, false,
            user_farm_wallet: true, false,
            ticket_owner: false, true,
            token_program: false, false,
            clock: false, false,
        );
        self.invoke(AldrinInstruction::WithdrawFarmed, accounts)
    }
}

/// A farming position: the AMM plus the wallets it moves tokens between
pub struct AldrinPosition<'a, 'info> {
    pub amm: AldrinAmm<'a, 'info>,
    pub ledger: SplTokenLedger<'a, 'info>,
}

impl AmmPool for AldrinPosition<'_, '_> {
    fn swap(&mut self, tokens: u64, min_tokens: u64, side: Side) -> Result<()> {
        self.amm.swap(tokens, min_tokens, side)
    }

    fn create_basket(&mut self, lp_tokens: u64, base_max: u64, quote_max: u64) -> Result<()> {
        self.amm.create_basket(lp_tokens, base_max, quote_max)
    }

    fn start_farming(&mut self, lp_tokens: u64) -> Result<()> {
        self.amm.start_farming(lp_tokens)
    }

    fn end_farming(&mut self) -> Result<()> {
        self.amm.end_farming()
    }

    fn redeem_basket(&mut self, lp_tokens: u64, base_min: u64, quote_min: u64) -> Result<()> {
        self.amm.redeem_basket(lp_tokens, base_min, quote_min)
    }

    fn withdraw_farmed(&mut self) -> Result<()> {
        self.amm.withdraw_farmed()
    }
}

impl TokenLedger for AldrinPosition<'_, '_> {
    fn balance(&self, wallet: &Pubkey) -> Result<u64> {
        self.ledger.balance(wallet)
    }

    fn transfer(&mut self, from: &Pubkey, to: &Pubkey, amount: u64) -> Result<()> {
        self.ledger.transfer(from, to, amount)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn pool_data(pool: &AldrinPool) -> Vec<u8> {
        let mut data = vec![0u8; ALDRIN_POOL_ACCOUNT_SIZE];
        let keys = [
            pool.lp_token_freeze_vault,
            pool.pool_mint,
            pool.base_token_vault,
            pool.base_token_mint,
            pool.quote_token_vault,
            pool.quote_token_mint,
        ];
        for (index, key) in keys.iter().enumerate() {
            let start = 8 + index * 32;
            data[start..start + 32].copy_from_slice(key.as_ref());
        }
        data
    }

    pub(crate) fn pool() -> AldrinPool {
        AldrinPool {
            lp_token_freeze_vault: Pubkey::new_unique(),
            pool_mint: Pubkey::new_unique(),
            base_token_vault: Pubkey::new_unique(),
            base_token_mint: Pubkey::new_unique(),
            quote_token_vault: Pubkey::new_unique(),
            quote_token_mint: Pubkey::new_unique(),
        }
    }

    #[test]
    fn swap_data() {
        let data = AldrinInstruction::Swap {
            tokens: 10,
            min_tokens: 5,
            side: Side::Ask,
        }
        .data();
        assert_eq!(
            data,
            vec![
                248, 198, 158, 145, 225, 117, 135, 200, 10, 0, 0, 0, 0, 0, 0, 0, 5, 0, 0, 0, 0,
                0, 0, 0, 1
            ]
        );
    }

    #[test]
    fn create_basket_data() {
        let data = AldrinInstruction::CreateBasket {
            creation_size: 1,
            base_token_used_max: 2,
            quote_token_used_max: 3,
        }
        .data();
        assert_eq!(&data[..8], &[47, 105, 155, 148, 15, 169, 202, 211]);
        assert_eq!(&data[8..16], &1u64.to_le_bytes());
        assert_eq!(&data[16..24], &2u64.to_le_bytes());
        assert_eq!(&data[24..32], &3u64.to_le_bytes());
    }

    #[test]
    fn farming_data() {
        assert_eq!(
            AldrinInstruction::StartFarming {
                pool_token_amount: 256
            }
            .data(),
            vec![150, 205, 185, 109, 97, 202, 68, 110, 0, 1, 0, 0, 0, 0, 0, 0]
        );
        assert_eq!(
            AldrinInstruction::EndFarming.data(),
            vec![49, 90, 68, 217, 222, 198, 89, 21]
        );
        assert_eq!(
            AldrinInstruction::WithdrawFarmed.data(),
            vec![175, 95, 99, 74, 63, 66, 237, 61]
        );
    }

    #[test]
    fn redeem_basket_data() {
        let data = AldrinInstruction::RedeemBasket {
            redemption_size: 7,
            base_token_returned_min: 0,
            quote_token_returned_min: 0,
        }
        .data();
        assert_eq!(data.len(), 32);
        assert_eq!(&data[..8], &[37, 133, 222, 57, 189, 160, 151, 41]);
        assert_eq!(data[8], 7);
    }

    #[test]
    fn loads_pool_keys() {
        let pool = pool();
        assert_eq!(AldrinPool::load(&pool_data(&pool)).unwrap(), pool);
        assert_eq!(
            AldrinPool::load(&[0u8; 440]).unwrap_err(),
            LendingError::InvalidAmmPool.into()
        );
    }

    #[test]
    fn side_follows_reserve_mint() {
        let pool = pool();
        assert_eq!(Side::for_mint(&pool.base_token_mint, &pool).unwrap(), Side::Ask);
        assert_eq!(Side::for_mint(&pool.quote_token_mint, &pool).unwrap(), Side::Bid);
        assert!(Side::for_mint(&Pubkey::new_unique(), &pool).is_err());
        assert_eq!(!Side::Ask, Side::Bid);
        assert_eq!(!Side::Bid, Side::Ask);
    }

    #[test]
    fn lp_price_splits_pool_value() {
        let price =
            lp_token_market_price(50, Decimal::from(300u64), Decimal::from(200u64)).unwrap();
        assert_eq!(price, Decimal::from(10u64));
        assert!(lp_token_market_price(0, Decimal::one(), Decimal::one()).is_err());
    }

    #[test]
    fn unstable_lp_price_doubles_one_vault() {
        // 500 tokens at 4 in each vault, 1000 LP tokens minted
        let price = unstable_lp_token_market_price(1_000, 0, 500, 0, Decimal::from(4u64)).unwrap();
        assert_eq!(price, Decimal::from(4u64));

        // same pool with 6 decimal LP tokens and 9 decimal vault tokens
        let price = unstable_lp_token_market_price(
            1_000_000_000,
            6,
            500_000_000_000,
            9,
            Decimal::from(4u64),
        )
        .unwrap();
        assert_eq!(price, Decimal::from(4u64));

        assert!(unstable_lp_token_market_price(0, 0, 500, 0, Decimal::one()).is_err());
    }

    #[test]
    fn vault_mint_follows_the_vault_side() {
        let pool = pool();
        assert_eq!(pool.vault_mint(&pool.base_token_vault).unwrap(), pool.base_token_mint);
        assert_eq!(pool.vault_mint(&pool.quote_token_vault).unwrap(), pool.quote_token_mint);
        assert_eq!(
            pool.vault_mint(&pool.lp_token_freeze_vault).unwrap_err(),
            LendingError::InvalidAmmPool.into()
        );
    }

    #[test]
    fn missing_account_is_reported() {
        let accounts = AldrinAccounts::default();
        assert_eq!(
            required(&accounts.pool, "pool").unwrap_err(),
            LendingError::InvalidAccountInput.into()
        );
    }
}
