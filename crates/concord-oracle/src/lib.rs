// crates/concord-oracle/src/lib.rs
//
// concord-oracle: commit-reveal price oracle for Concord.
//
// Validators commit to a hashed price in one vote period and reveal it in
// the next. At the end of every period the revealed votes for each denom are
// reduced to a stake-weighted median, which becomes the exchange rate when
// enough stake took part. Voters close to the median earn oracle claims.

pub mod ballot;
pub mod commit;
pub mod feeder;
pub mod keeper;
pub mod rates;
pub mod reveal;
pub mod tally;

pub use ballot::{Ballot, BallotEntry};
pub use commit::{CommitStore, Commitment};
pub use keeper::OracleKeeper;
pub use reveal::{RevealStore, Vote};
pub use tally::{DenomTally, PricePassOutcome, PriceTally, RateDecision};
