use anyhow::Result;

pub mod estate;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

// A game state for sequential games with n players. Players take turns in seat
// order and a round is over once every player still in the game has moved.
pub trait GameState {
    // Seats that are still taking turns.
    fn active_players(&self) -> Vec<usize>;

    // Tell if the game is over. Games with fewer than two registered players
    // never started and are not over.
    fn is_game_over(&self) -> bool;

    fn winner(&self) -> Option<usize>;
}
