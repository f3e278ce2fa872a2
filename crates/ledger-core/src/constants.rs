pub const HASH_SIZE: usize = 32;
pub const HASH_HEX_SIZE: usize = HASH_SIZE * 2;
pub const ADDRESS_HEX_SIZE: usize = 40;
pub const GENESIS_PREVIOUS_HASH: &str = "0";
pub const DEFAULT_DIFFICULTY: usize = 4;
pub const DEFAULT_MINING_REWARD: i64 = 100;
pub const MIN_KEY_BITS: usize = 2048;
pub const DEFAULT_KEY_BITS: usize = MIN_KEY_BITS;
