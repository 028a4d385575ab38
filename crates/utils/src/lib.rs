pub mod assets;
pub mod response;
pub mod share_token;
pub mod totals;
pub mod validation;
