use std::fmt;

use anyhow::{anyhow, Result};
use rand::Rng;

use crate::games::estate::{Rent, State};
use crate::games::{GameState, Validate};
use crate::history::History;
use crate::policy::{Policy, TurnChoice};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Setup,
    AwaitingRoll,
    Resolving,
    CheckWin,
    GameOver,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Winner(usize),
    // Nobody went broke before the round limit
    RoundLimit,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    TurnStarted { player: String, cash: i64, location: String, holdings: Vec<String> },
    Rolled { player: String, roll: usize },
    PassedGo { player: String, income: i64 },
    Moved { player: String, location: String },
    PurchaseOffered { player: String, space: String, price: i64 },
    Bought { player: String, space: String, cash: i64 },
    CannotAfford { player: String, space: String, cash: i64 },
    Declined { player: String, space: String },
    OwnProperty { player: String },
    PaidRent { player: String, owner: String, rent: i64, cash: i64 },
    Bankrupt { player: String, creditor: String, paid: i64 },
    Quit { player: String },
    RoundEnded { round: usize, standings: Vec<(String, i64)> },
    Winner { player: String, cash: i64 },
    RoundLimit { rounds: usize },
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::TurnStarted { player, cash, location, holdings } => {
                writeln!(f, "\nIt's your turn: {}", player)?;
                writeln!(f, "{} currently has ${}", player, cash)?;
                writeln!(f, "{} is currently at {}", player, location)?;
                write!(f, "Currently owns: [{}]", holdings.join(", "))
            },
            Event::Rolled { player, roll } => write!(f, "{} has rolled a {}", player, roll),
            Event::PassedGo { player, income } => write!(f, "{} passed Go and collected ${}", player, income),
            Event::Moved { player, location } => write!(f, "{} has moved to {}", player, location),
            Event::PurchaseOffered { space, price, .. } => write!(f, "You may purchase {} for ${}!", space, price),
            Event::Bought { player, space, cash } => {
                writeln!(f, "{} has purchased {}", player, space)?;
                write!(f, "{} now has ${}", player, cash)
            },
            Event::CannotAfford { player, space, cash } => {
                writeln!(f, "Whoops, {} can't afford {}!", player, space)?;
                write!(f, "{} now has ${}", player, cash)
            },
            Event::Declined { player, space } => write!(f, "{} passed on {}", player, space),
            Event::OwnProperty { player } => write!(f, "{} owns this property. Yay!", player),
            Event::PaidRent { player, owner, rent, cash } => {
                writeln!(f, "{} had to pay ${} in rent to {}", player, rent, owner)?;
                write!(f, "{} now has ${}", player, cash)
            },
            Event::Bankrupt { player, creditor, paid } => {
                writeln!(f, "{} couldn't cover the rent and paid their last ${} to {}", player, paid, creditor)?;
                write!(f, "{} has been defeated!", player)
            },
            Event::Quit { player } => {
                writeln!(f, "{} has left the game.", player)?;
                write!(f, "{} has been defeated!", player)
            },
            Event::RoundEnded { round, standings } => {
                write!(f, "\nThe following players are still in the game after round {}!", round)?;
                for (player, cash) in standings {
                    write!(f, "\n{} with: ${}", player, cash)?;
                }
                Ok(())
            },
            Event::Winner { player, cash } => write!(f, "\nWe have a winner!\n{} with ${}", player, cash),
            Event::RoundLimit { rounds } => write!(f, "\nNo winner after {} rounds, calling it a draw.", rounds),
        }
    }
}

// Runs one game as a state machine, one transition per `step`
pub struct Engine<R: Rng> {
    state: State,
    history: History,
    policy: Box<dyn Policy>,
    rng: R,
    phase: Phase,
    current: usize,
    round: usize,
    max_rounds: Option<usize>,
    outcome: Option<Outcome>,
}

impl<R: Rng> Engine<R> {
    pub fn new(state: State, policy: Box<dyn Policy>, rng: R, max_rounds: Option<usize>) -> Self {
        let names = state.players.iter().map(|p| p.name.clone()).collect();

        Engine {
            state,
            history: History::new(names),
            policy,
            rng,
            phase: Phase::Setup,
            current: 0,
            round: 0,
            max_rounds,
            outcome: None,
        }
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn into_history(self) -> History {
        self.history
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn round(&self) -> usize {
        self.round
    }

    pub fn current_player(&self) -> usize {
        self.current
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.outcome
    }

    pub fn step(&mut self) -> Result<Phase> {
        self.phase = match self.phase {
            Phase::Setup => self.setup()?,
            Phase::AwaitingRoll => self.await_roll()?,
            Phase::Resolving => self.resolve()?,
            Phase::CheckWin => self.check_win()?,
            Phase::GameOver => Phase::GameOver,
        };

        Ok(self.phase)
    }

    pub fn run(&mut self) -> Result<Outcome> {
        while self.phase() != Phase::GameOver {
            self.step()?;
        }

        self.outcome().ok_or_else(|| anyhow!("Game ended without an outcome"))
    }

    fn emit(&mut self, event: Event) -> Result<()> {
        log::debug!("{}", event);
        self.policy.observe(&event)
    }

    fn setup(&mut self) -> Result<Phase> {
        self.state.validate()?;

        for (i, p) in self.state.players.iter().enumerate() {
            self.history.record(i, 0, p.cash)?;
        }

        log::info!("Starting a game with {} players", self.state.players.len());
        self.current = 0;
        self.round = 1;
        Ok(Phase::AwaitingRoll)
    }

    fn await_roll(&mut self) -> Result<Phase> {
        let seat = self.current_player();
        let player = self.state.players[seat].name.clone();
        let started = Event::TurnStarted {
            player: player.clone(),
            cash: self.state.balance(&player).ok_or_else(|| anyhow!("No player named {}", player))?,
            location: self.state
                .location_name(&player)
                .ok_or_else(|| anyhow!("No player named {}", player))?
                .to_string(),
            holdings: self.state.holding_names(seat),
        };
        self.emit(started)?;

        match self.policy.start_turn(&self.state.players[seat])? {
            TurnChoice::Quit => {
                let cash = self.state.players[seat].cash;
                self.state.eliminate(seat)?;
                self.history.record(seat, self.round, cash)?;
                self.emit(Event::Quit { player })?;
                Ok(Phase::CheckWin)
            },
            TurnChoice::Roll => {
                let roll = self.state.dice.roll(&mut self.rng);
                self.emit(Event::Rolled { player: player.clone(), roll })?;

                let movement = self.state.advance(seat, roll)?;
                if movement.passed_go {
                    self.emit(Event::PassedGo { player: player.clone(), income: self.state.go_cash })?;
                }

                let location = self.state.spaces[movement.to].name.clone();
                self.emit(Event::Moved { player, location })?;
                Ok(Phase::Resolving)
            },
        }
    }

    // Rent if somebody else owns the space, a purchase offer if nobody does
    fn resolve(&mut self) -> Result<Phase> {
        let seat = self.current;
        let player = self.state.players[seat].name.clone();
        let position = self.state.players[seat].position;
        let space = &self.state.spaces[position];
        let (space_name, owner, ownable) = (space.name.clone(), space.owner, space.is_ownable());

        match owner {
            Some(owner) if owner == seat => self.emit(Event::OwnProperty { player })?,
            Some(_) => match self.state.charge_rent(seat)? {
                Some(Rent::Paid { owner, amount }) => {
                    self.emit(Event::PaidRent {
                        player,
                        owner: self.state.players[owner].name.clone(),
                        rent: amount,
                        cash: self.state.players[seat].cash,
                    })?;
                },
                Some(Rent::Bankrupt { owner, amount }) => {
                    self.history.record(seat, self.round, 0)?;
                    self.emit(Event::Bankrupt {
                        player,
                        creditor: self.state.players[owner].name.clone(),
                        paid: amount,
                    })?;
                },
                None => {},
            },
            None if ownable => {
                self.emit(Event::PurchaseOffered {
                    player: player.clone(),
                    space: space_name.clone(),
                    price: self.state.spaces[position].price,
                })?;

                if self.policy.should_buy(&self.state.players[seat], &self.state.spaces[position])? {
                    let bought = self.state.buy_space(seat)?;
                    let cash = self.state.players[seat].cash;
                    if bought {
                        self.emit(Event::Bought { player, space: space_name, cash })?;
                    } else {
                        self.emit(Event::CannotAfford { player, space: space_name, cash })?;
                    }
                } else {
                    self.emit(Event::Declined { player, space: space_name })?;
                }
            },
            None => {},
        }

        Ok(Phase::CheckWin)
    }

    fn check_win(&mut self) -> Result<Phase> {
        if self.state.is_game_over() {
            return self.finish();
        }

        let next = self.next_seat()?;
        if next <= self.current {
            self.end_round()?;

            if let Some(limit) = self.max_rounds {
                if self.round > limit {
                    self.emit(Event::RoundLimit { rounds: limit })?;
                    log::info!("No winner after {} rounds", limit);
                    self.outcome = Some(Outcome::RoundLimit);
                    return Ok(Phase::GameOver);
                }
            }
        }

        self.current = next;
        Ok(Phase::AwaitingRoll)
    }

    fn finish(&mut self) -> Result<Phase> {
        let winner = self.state
            .winner()
            .ok_or_else(|| anyhow!("Nobody is left in the game"))?;
        let p = &self.state.players[winner];
        let (player, cash) = (p.name.clone(), p.cash);

        self.history.record(winner, self.round, cash)?;
        log::info!("{} won with ${} in round {}", player, cash, self.round);
        self.emit(Event::Winner { player, cash })?;

        self.outcome = Some(Outcome::Winner(winner));
        Ok(Phase::GameOver)
    }

    // Next seat still in the game after the current one, wrapping around
    fn next_seat(&self) -> Result<usize> {
        let n_players = self.state.players.len();
        (1..=n_players)
            .map(|offset| (self.current + offset) % n_players)
            .find(|&seat| self.state.players[seat].solvent)
            .ok_or_else(|| anyhow!("Nobody is left in the game"))
    }

    fn end_round(&mut self) -> Result<()> {
        let mut standings = Vec::new();
        for seat in self.state.active_players() {
            let p = &self.state.players[seat];
            self.history.record(seat, self.round, p.cash)?;
            standings.push((p.name.clone(), p.cash));
        }

        log::debug!("Round {} over, {} players left", self.round, standings.len());
        self.emit(Event::RoundEnded { round: self.round, standings })?;
        self.round += 1;
        Ok(())
    }
}
