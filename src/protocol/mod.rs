//! Wire message types shared by client and server.

pub mod edit;
pub mod transfer;
