use anchor_lang::prelude::*;
use anchor_lang::solana_program::instruction::Instruction;
use anchor_lang::solana_program::program::invoke;

use crate::adapters::TokenLedger;
use crate::errors::LendingError;
use crate::math::Decimal;
use crate::state::Reserve;

/// Program which receives the loan and must pay it back before returning
pub trait FlashLoanReceiver {
    fn receive(&mut self, amount_with_fee: u64) -> Result<()>;
}

/// Receiver reached by CPI. Gets `data_prefix` followed by the amount owed
/// as a little endian u64, and every account in `accounts`.
pub struct ProgramReceiver<'info> {
    pub program: AccountInfo<'info>,
    pub accounts: Vec<AccountInfo<'info>>,
    pub data_prefix: Vec<u8>,
}

impl FlashLoanReceiver for ProgramReceiver<'_> {
    fn receive(&mut self, amount_with_fee: u64) -> Result<()> {
        let mut data = Vec::with_capacity(self.data_prefix.len() + 8);
        data.extend_from_slice(&self.data_prefix);
        data.extend_from_slice(&amount_with_fee.to_le_bytes());

        let metas = self
            .accounts
            .iter()
            .map(|a| AccountMeta {
                pubkey: *a.key,
                is_signer: a.is_signer,
                is_writable: a.is_writable,
            })
            .collect();

        let ix = Instruction {
            program_id: *self.program.key,
            accounts: metas,
            data,
        };

        let mut infos = self.accounts.clone();
        infos.push(self.program.clone());
        invoke(&ix, &infos)?;
        Ok(())
    }
}

/// The loan can only be handed to another executable program. Calling back
/// into this program would let the receiver borrow against the lent liquidity.
pub fn check_target_program(target_program: &Pubkey, executable: bool) -> Result<()> {
    if !executable || *target_program == crate::ID {
        msg!("Flash loan target program must be an executable other than lending");
        return err!(LendingError::InvalidFlashLoanTargetProgram);
    }

    Ok(())
}

/// Wallets taking part in a flash loan
pub struct FlashLoan {
    /// Reserve liquidity supply
    pub supply: Pubkey,
    pub destination: Pubkey,
    pub fee_receiver: Pubkey,
    pub amount: u64,
}

/// Lends `loan.amount` from the reserve supply, hands control to `receiver`
/// and checks the supply got the loan back plus fee. Returns the fee.
pub fn execute_flash_loan<L: TokenLedger, R: FlashLoanReceiver>(
    reserve: &mut Reserve,
    ledger: &mut L,
    receiver: &mut R,
    loan: FlashLoan,
) -> Result<u64> {
    require!(loan.amount > 0, LendingError::InvalidAmount);

    let flash_loan_amount = Decimal::from(loan.amount);
    let (fee, _) = reserve.config.fees.flash_loan_fees(flash_loan_amount)?;

    let balance_before = ledger.balance(&loan.supply)?;
    let expected_balance_after = balance_before
        .checked_add(fee)
        .ok_or(LendingError::MathOverflow)?;
    let amount_with_fee = loan
        .amount
        .checked_add(fee)
        .ok_or(LendingError::MathOverflow)?;

    reserve.liquidity.borrow(flash_loan_amount)?;
    ledger.transfer(&loan.supply, &loan.destination, loan.amount)?;

    receiver.receive(amount_with_fee)?;

    reserve.liquidity.repay(loan.amount, flash_loan_amount)?;

    let balance_after = ledger.balance(&loan.supply)?;
    if balance_after < expected_balance_after {
        msg!(
            "Insufficient reserve liquidity after flash loan, expected {} but got {}",
            expected_balance_after,
            balance_after
        );
        return err!(LendingError::FlashLoanNotRepaid);
    }

    ledger.transfer(&loan.supply, &loan.fee_receiver, fee)?;

    Ok(fee)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::state::reserve::tests::reserve;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::rc::Rc;

    /// Balances shared between a ledger and the fakes acting on it
    #[derive(Clone, Default)]
    pub(crate) struct MemoryLedger {
        pub(crate) balances: Rc<RefCell<HashMap<Pubkey, u64>>>,
    }

    impl MemoryLedger {
        pub(crate) fn with(balances: &[(Pubkey, u64)]) -> Self {
            let ledger = Self::default();
            ledger.balances.borrow_mut().extend(balances.iter().copied());
            ledger
        }

        pub(crate) fn get(&self, wallet: &Pubkey) -> u64 {
            self.balances.borrow().get(wallet).copied().unwrap_or(0)
        }

        pub(crate) fn set(&self, wallet: &Pubkey, amount: u64) {
            self.balances.borrow_mut().insert(*wallet, amount);
        }
    }

    impl TokenLedger for MemoryLedger {
        fn balance(&self, wallet: &Pubkey) -> Result<u64> {
            Ok(self.get(wallet))
        }

        fn transfer(&mut self, from: &Pubkey, to: &Pubkey, amount: u64) -> Result<()> {
            let from_balance = self
                .get(from)
                .checked_sub(amount)
                .ok_or(LendingError::InsufficientFunds)?;
            self.set(from, from_balance);
            self.set(to, self.get(to) + amount);
            Ok(())
        }
    }

    /// Sends `returned` back to the supply out of the destination wallet
    struct Repayer {
        ledger: MemoryLedger,
        destination: Pubkey,
        supply: Pubkey,
        shortfall: u64,
        received: Option<u64>,
    }

    impl FlashLoanReceiver for Repayer {
        fn receive(&mut self, amount_with_fee: u64) -> Result<()> {
            self.received = Some(amount_with_fee);
            self.ledger
                .transfer(&self.destination, &self.supply, amount_with_fee - self.shortfall)
        }
    }

    fn setup(shortfall: u64) -> (MemoryLedger, Repayer, FlashLoan) {
        let supply = Pubkey::new_unique();
        let destination = Pubkey::new_unique();
        let fee_receiver = Pubkey::new_unique();
        // the receiver already holds enough to cover the fee
        let ledger = MemoryLedger::with(&[(supply, 1_000), (destination, 10)]);
        let repayer = Repayer {
            ledger: ledger.clone(),
            destination,
            supply,
            shortfall,
            received: None,
        };
        let loan = FlashLoan {
            supply,
            destination,
            fee_receiver,
            amount: 100,
        };
        (ledger, repayer, loan)
    }

    #[test]
    fn repaid_loan_pays_fee() {
        let mut reserve = reserve(1_000, 1, 10);
        let (mut ledger, mut repayer, loan) = setup(0);
        let (supply, fee_receiver) = (loan.supply, loan.fee_receiver);

        let fee = execute_flash_loan(&mut reserve, &mut ledger, &mut repayer, loan).unwrap();

        // 0.3% of 100 rounds to 0, a host fee raises it to the 2 token minimum
        assert_eq!(fee, 2);
        assert_eq!(repayer.received, Some(102));
        assert_eq!(ledger.get(&supply), 1_000);
        assert_eq!(ledger.get(&fee_receiver), 2);
        assert_eq!(reserve.liquidity.available_amount, 1_000);
        assert_eq!(reserve.liquidity.borrowed_amount, Decimal::zero());
    }

    #[test]
    fn short_repay_fails() {
        let mut reserve = reserve(1_000, 1, 10);
        let (mut ledger, mut repayer, loan) = setup(1);

        assert_eq!(
            execute_flash_loan(&mut reserve, &mut ledger, &mut repayer, loan).unwrap_err(),
            LendingError::FlashLoanNotRepaid.into()
        );
    }

    #[test]
    fn target_must_be_another_executable_program() {
        assert!(check_target_program(&Pubkey::new_unique(), true).is_ok());
        assert_eq!(
            check_target_program(&Pubkey::new_unique(), false).unwrap_err(),
            LendingError::InvalidFlashLoanTargetProgram.into()
        );
        assert_eq!(
            check_target_program(&crate::ID, true).unwrap_err(),
            LendingError::InvalidFlashLoanTargetProgram.into()
        );
    }

    #[test]
    fn loan_cannot_exceed_available_liquidity() {
        let mut reserve = reserve(50, 1, 10);
        let (mut ledger, mut repayer, loan) = setup(0);

        assert_eq!(
            execute_flash_loan(&mut reserve, &mut ledger, &mut repayer, loan).unwrap_err(),
            LendingError::InsufficientFunds.into()
        );
        assert_eq!(repayer.received, None);
    }
}
