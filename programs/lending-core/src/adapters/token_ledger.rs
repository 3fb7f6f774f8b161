use anchor_lang::prelude::*;
use anchor_spl::token::{self, TokenAccount, Transfer};

use crate::adapters::TokenLedger;
use crate::errors::LendingError;

/// SPL token wallets moved by a single authority.
///
/// The authority is either a PDA of this program signing with
/// `signer_seeds`, or a transaction signer with no seeds.
pub struct SplTokenLedger<'a, 'info> {
    token_program: AccountInfo<'info>,
    authority: AccountInfo<'info>,
    signer_seeds: &'a [&'a [&'a [u8]]],
    wallets: Vec<AccountInfo<'info>>,
}

impl<'a, 'info> SplTokenLedger<'a, 'info> {
    pub fn new(
        token_program: AccountInfo<'info>,
        authority: AccountInfo<'info>,
        signer_seeds: &'a [&'a [&'a [u8]]],
        wallets: Vec<AccountInfo<'info>>,
    ) -> Self {
        Self {
            token_program,
            authority,
            signer_seeds,
            wallets,
        }
    }

    fn wallet(&self, key: &Pubkey) -> Result<&AccountInfo<'info>> {
        self.wallets.iter().find(|w| w.key == key).ok_or_else(|| {
            msg!("Token wallet {} was not provided", key);
            error!(LendingError::InvalidAccountInput)
        })
    }
}

impl TokenLedger for SplTokenLedger<'_, '_> {
    fn balance(&self, wallet: &Pubkey) -> Result<u64> {
        let info = self.wallet(wallet)?;
        let data = info.try_borrow_data()?;
        let account = TokenAccount::try_deserialize(&mut &data[..])?;
        Ok(account.amount)
    }

    fn transfer(&mut self, from: &Pubkey, to: &Pubkey, amount: u64) -> Result<()> {
        if amount == 0 {
            return Ok(());
        }

        let cpi_ctx = CpiContext::new_with_signer(
            self.token_program.clone(),
            Transfer {
                from: self.wallet(from)?.clone(),
                to: self.wallet(to)?.clone(),
                authority: self.authority.clone(),
            },
            self.signer_seeds,
        );
        token::transfer(cpi_ctx, amount)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Packed SPL token account with an initialized state
    pub(crate) fn token_account_data(mint: &Pubkey, owner: &Pubkey, amount: u64) -> Vec<u8> {
        let mut data = vec![0u8; 165];
        data[0..32].copy_from_slice(mint.as_ref());
        data[32..64].copy_from_slice(owner.as_ref());
        data[64..72].copy_from_slice(&amount.to_le_bytes());
        // account state: initialized
        data[108] = 1;
        data
    }

    #[test]
    fn reads_balance_of_known_wallet() {
        let key = Pubkey::new_unique();
        let program = token::ID;
        let authority = Pubkey::new_unique();
        let mut wallet_lamports = 0;
        let mut program_lamports = 0;
        let mut authority_lamports = 0;
        let mut data = token_account_data(&Pubkey::new_unique(), &authority, 42);
        let mut empty: Vec<u8> = vec![];
        let mut empty_too: Vec<u8> = vec![];

        let wallet = AccountInfo::new(&key, false, true, &mut wallet_lamports, &mut data, &program, false, 0);
        let token_program = AccountInfo::new(&program, false, false, &mut program_lamports, &mut empty, &program, true, 0);
        let authority_info = AccountInfo::new(&authority, true, false, &mut authority_lamports, &mut empty_too, &program, false, 0);

        let ledger = SplTokenLedger::new(token_program, authority_info, &[], vec![wallet]);
        assert_eq!(ledger.balance(&key).unwrap(), 42);
        assert_eq!(
            ledger.balance(&Pubkey::new_unique()).unwrap_err(),
            LendingError::InvalidAccountInput.into()
        );
    }
}
