//! Theme preference commands.

use mercato_client::state::AppContext;
use mercato_client::theme::Theme;

pub fn show(ctx: &AppContext) {
    tracing::info!("Theme: {}", ctx.theme().current());
}

pub fn toggle(ctx: &AppContext) {
    let theme = ctx.theme().toggle();
    tracing::info!("Theme switched to {theme}");
}

pub fn set(ctx: &AppContext, theme: Theme) {
    ctx.theme().set(theme);
    tracing::info!("Theme set to {theme}");
}
