//! Navigation guard preview.

use mercato_client::guard::GuardDecision;
use mercato_client::state::AppContext;

pub fn check(ctx: &AppContext, path: &str) {
    match ctx.guard(path) {
        GuardDecision::Allow => tracing::info!("{path}: allowed"),
        GuardDecision::RedirectTo(target) => {
            tracing::info!("{path}: redirected to {target}");
        }
    }
}
