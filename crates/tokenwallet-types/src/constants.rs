//! System-wide constants for the TokenWallet ledger.

/// Fractional digits carried by every token amount.
pub const AMOUNT_SCALE: u32 = 4;

/// Minor units per whole token (10^`AMOUNT_SCALE`).
pub const MINOR_UNITS_PER_TOKEN: u64 = 10_000;

/// Prefix that marks a string as a wallet address rather than a name/email.
pub const DEFAULT_ADDRESS_PREFIX: &str = "0x";

/// Minimum length (prefix included) of a string treated as a wallet address.
pub const DEFAULT_MIN_ADDRESS_LEN: usize = 26;

/// Number of hex characters in a derived wallet address body.
pub const ADDRESS_BODY_HEX_LEN: usize = 40;

/// Default number of search results when the caller gives no limit.
pub const DEFAULT_SEARCH_LIMIT: usize = 10;

/// Hard cap on search results, whatever the caller asks for.
pub const MAX_SEARCH_LIMIT: usize = 50;

/// Queries shorter than this (after trimming) return no results.
pub const MIN_SEARCH_QUERY_LEN: usize = 2;

/// Default number of recent recipients / history rows returned.
pub const DEFAULT_HISTORY_LIMIT: usize = 20;

/// Hard cap on history / recent-recipient rows.
pub const MAX_HISTORY_LIMIT: usize = 200;

/// Maximum memo length accepted on a transfer (characters).
pub const MAX_MEMO_LEN: usize = 280;

/// Idempotency cache size (number of (user, key) results to remember).
pub const IDEMPOTENCY_CACHE_SIZE: usize = 100_000;

/// Default API listen port.
pub const DEFAULT_API_PORT: u16 = 8080;

/// Default server-side request timeout in milliseconds.
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Service name reported by the health endpoint.
pub const SERVICE_NAME: &str = "tokenwallet";
