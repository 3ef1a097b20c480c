//! Backend-list template rendering.

use minijinja::{Environment, UndefinedBehavior, context};
use serde::Serialize;

/// One backend the load balancer should route to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BalancerTarget {
    pub name: String,
    pub address: String,
}

impl BalancerTarget {
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
        }
    }
}

fn environment() -> Environment<'static> {
    let mut env = Environment::new();
    env.set_undefined_behavior(UndefinedBehavior::Strict);
    env.set_trim_blocks(true);
    env.set_lstrip_blocks(true);
    env.set_keep_trailing_newline(true);
    env
}

/// Render `template` for `targets`.
///
/// The template sees `targets` (each with `name` and `address`),
/// `addresses` (the bare address list) and `count`.
pub fn render(template: &str, targets: &[BalancerTarget]) -> Result<String, minijinja::Error> {
    let addresses: Vec<&str> = targets.iter().map(|t| t.address.as_str()).collect();
    environment().render_str(
        template,
        context! {
            targets => targets,
            addresses => addresses,
            count => targets.len(),
        },
    )
}
