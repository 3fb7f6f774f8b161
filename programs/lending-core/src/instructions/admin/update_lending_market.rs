use anchor_lang::prelude::*;

use crate::errors::LendingError;
use crate::events::LendingMarketUpdated;
use crate::math::Decimal;
use crate::state::LendingMarket;

/// Accounts for changing lending market settings
#[derive(Accounts)]
pub struct UpdateLendingMarket<'info> {
    /// Owner of the lending market
    pub owner: Signer<'info>,

    /// Bot allowed to compound positions and take snapshots
    /// CHECK: Only the key is stored
    pub admin_bot: UncheckedAccount<'info>,

    #[account(
        mut,
        has_one = owner @ LendingError::InvalidMarketOwner
    )]
    pub lending_market: Account<'info, LendingMarket>,
}

/// Settings the owner can change after initialization
#[derive(AnchorSerialize, AnchorDeserialize, Clone)]
pub struct UpdateLendingMarketParams {
    /// Percentage of leveraged position rewards kept by the admin bot
    pub leveraged_compound_fee: u8,

    /// Percentage of vault position rewards kept by the admin bot
    pub vault_compound_fee: u8,

    /// Obligations below this deposited value cannot open leverage
    pub min_collateral_uac_value_for_leverage: Decimal,
}

/// Update admin bot, compound fees and the leverage collateral minimum
///
/// # Arguments
/// * `ctx` - The context containing all accounts
/// * `params` - New market settings
pub fn handler(ctx: Context<UpdateLendingMarket>, params: UpdateLendingMarketParams) -> Result<()> {
    require!(
        params.leveraged_compound_fee <= 100 && params.vault_compound_fee <= 100,
        LendingError::InvalidConfig
    );

    let lending_market = &mut ctx.accounts.lending_market;
    lending_market.admin_bot = ctx.accounts.admin_bot.key();
    lending_market.leveraged_compound_fee = params.leveraged_compound_fee;
    lending_market.vault_compound_fee = params.vault_compound_fee;
    lending_market.min_collateral_uac_value_for_leverage =
        params.min_collateral_uac_value_for_leverage;

    emit!(LendingMarketUpdated {
        lending_market: lending_market.key(),
        admin_bot: lending_market.admin_bot,
        leveraged_compound_fee: lending_market.leveraged_compound_fee,
        vault_compound_fee: lending_market.vault_compound_fee,
        min_collateral_uac_value_for_leverage: lending_market
            .min_collateral_uac_value_for_leverage
            .to_scaled_val()?,
    });

    msg!("Lending market updated: {}", lending_market.key());
    msg!("Admin bot: {}", lending_market.admin_bot);

    Ok(())
}
