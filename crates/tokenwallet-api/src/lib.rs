//! # tokenwallet-api
//!
//! REST surface for the TokenWallet ledger.
//!
//! | Method | Path                                 | Auth     |
//! |--------|--------------------------------------|----------|
//! | GET    | `/health`                            | none     |
//! | GET    | `/users/search?q=&limit=`            | bearer   |
//! | GET    | `/wallet/validate-address?address=`  | bearer   |
//! | GET    | `/wallet/balance`                    | bearer   |
//! | POST   | `/wallet/send`                       | bearer   |
//! | POST   | `/wallet/exchange/to-sendable`       | bearer   |
//! | POST   | `/wallet/exchange/to-non-sendable`   | bearer   |
//! | GET    | `/wallet/recent-recipients?limit=`   | bearer   |
//! | GET    | `/wallet/transactions?limit=`        | bearer   |
//! | POST   | `/internal/users`                    | internal |
//! | POST   | `/internal/rewards`                  | internal |
//!
//! Every body is `{success, message, data?}`.

pub mod auth;
pub mod config;
pub mod logging;
pub mod response;
pub mod routes;

pub use auth::{Authenticator, StaticTokens};
pub use response::{ApiError, Envelope};
pub use routes::{AppState, build_router};
