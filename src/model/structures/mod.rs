pub mod game_mode;
pub mod player_standing;
