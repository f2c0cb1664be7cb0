pub mod bucket;
pub mod constants;
pub mod leaderboard;
pub mod seed;
pub mod structures;
pub mod sync;
pub mod validation;
