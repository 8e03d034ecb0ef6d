// crates/concord-core/src/period.rs
//
// Block-height arithmetic for vote periods and reward epochs.
//
// Heights are 0-indexed. A period of length `p` spans heights
// `[k*p, (k+1)*p)`; its last block is the one where `height % p == p - 1`.

/// Whether `height` is the last block of a period of `period` blocks.
///
/// A zero-length period never ends; params validation rejects it.
pub fn is_period_last_block(height: u64, period: u64) -> bool {
    period != 0 && height % period == period - 1
}

/// Index of the period containing `height`.
pub fn period_of(height: u64, period: u64) -> u64 {
    if period == 0 {
        return 0;
    }
    height / period
}

/// Index of the reward epoch containing `height`.
pub fn epoch_of(height: u64, blocks_per_epoch: u64) -> u64 {
    period_of(height, blocks_per_epoch)
}
