//! Service-wide constants.

/// Winc per credit. 1 credit = 10^12 winc.
pub const WINC_PER_CREDIT: u64 = 1_000_000_000_000;

/// Uploads are priced in 256 KiB chunks.
pub const CHUNK_BYTE_SIZE: u64 = 262_144;

/// How long a top-up quote remains fulfillable.
pub const TOP_UP_QUOTE_TTL_SECS: u64 = 60 * 60;

/// How long an email-addressed gift remains redeemable.
pub const GIFT_TTL_SECS: u64 = 60 * 60 * 24 * 365;
