//! fleetscale-balancer — pushes fleet membership into a load balancer.
//!
//! After a scaling action the daemon hands the current private addresses
//! to [`Balancer::refresh`], which renders the configured template, swaps
//! the rendered file into place, and runs the reload command.
//!
//! # Template Syntax
//!
//! Templates are Jinja-style, rendered at refresh time with `minijinja`:
//!
//! ```text
//! # {{ count }} backends
//! backend app
//!     balance roundrobin
//!     {% for t in targets %}
//!     server web{{ loop.index }} {{ t.address }}:80 check   # {{ t.name }}
//!     {% endfor %}
//! ```
//!
//! The context holds `targets` (each with `name` and `address`),
//! `addresses` (the bare address list) and `count`. Block tags swallow their
//! own line, and undefined variables are an error rather than blank output.

pub mod error;
pub mod refresh;
pub mod template;

pub use error::{BalancerError, BalancerResult};
pub use refresh::Balancer;
pub use template::{BalancerTarget, render};
