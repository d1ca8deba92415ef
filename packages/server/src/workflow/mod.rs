//! Business rules of the portal: status machine, permissions, wizard
//! sequencing, listing composition and the services that persist them.

pub mod challenges;
pub mod documents;
pub mod permissions;
pub mod query;
pub mod status;
pub mod submissions;
pub mod wizard;
