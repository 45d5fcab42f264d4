pub mod decision;
pub mod factory;
pub mod filter;
pub mod outcome;
pub mod owner;
pub mod team;
pub mod token;
pub mod validation;

pub use decision::{Authorizer, TeamResolvers};
pub use factory::build_authorizer;
pub use outcome::{AuthOutcome, RejectReason, StateBag};
