// -
// Persistence keys

/// Reserved key of the configuration record; never collides with a durable
/// characteristic key, which is 15 hex digits.
pub(crate) const CONFIG_RECORD_KEY: &str = "_hapdb_config_record";

// -
// Identity limits

/// First instance id handed out in every accessory
pub(crate) const FIRST_INSTANCE_ID: u32 = 1;

/// Durable keys carry only these bits of the instance id
pub(crate) const DURABLE_IID_MASK: u32 = 0xFFF;

/// Configuration version wraps from here back to 1
pub(crate) const MAX_CONFIG_VERSION: u16 = u16::MAX;
