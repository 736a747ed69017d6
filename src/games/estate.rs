use super::{GameState, Validate};
use crate::config::BoardConfig;
use std::collections::HashSet;
use std::fmt;
use anyhow::{anyhow, bail, Result};
use rand::Rng;

pub const BOARD_SIZE: usize = 25;
pub const MIN_PLAYERS: usize = 2;
pub const MAX_PLAYERS: usize = 30;
const GO: usize = 0;
const PRICE_PER_RENT: i64 = 5;
// Cap on rents, lap income and starting cash, so balances stay far from overflow
const MAX_AMOUNT: i64 = 1_000_000_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Dice {
    count: u8,
    sides: u8,
}

impl Default for Dice {
    fn default() -> Self {
        Dice { count: 1, sides: 6 }
    }
}

impl fmt::Display for Dice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}d{}", self.count, self.sides)
    }
}

impl Dice {
    // A single roll has to stay below the board size so one move never passes
    // Go twice.
    pub fn new(count: u8, sides: u8) -> Result<Self> {
        if count == 0 || sides < 2 {
            return Err(anyhow!("Need at least one die with two sides, got {}d{}", count, sides));
        }
        if count as usize * sides as usize >= BOARD_SIZE {
            return Err(anyhow!("{}d{} can move a player all the way around the board", count, sides));
        }

        Ok(Dice { count, sides })
    }

    pub fn min(&self) -> usize {
        self.count as usize
    }

    pub fn max(&self) -> usize {
        self.count as usize * self.sides as usize
    }

    pub fn contains(&self, roll: usize) -> bool {
        (self.min()..=self.max()).contains(&roll)
    }

    pub fn roll<R: Rng>(&self, rng: &mut R) -> usize {
        (0..self.count)
            .map(|_| rng.random_range(1..=self.sides as usize))
            .sum()
    }
}

#[derive(Clone, Debug)]
pub struct Space {
    pub name: String,
    pub position: usize,
    pub rent: i64,
    pub price: i64,
    pub owner: Option<usize>,
}

impl Space {
    fn go(name: String) -> Self {
        Space { name, position: GO, rent: 0, price: 0, owner: None }
    }

    fn property(name: String, position: usize, rent: i64) -> Self {
        Space { name, position, rent, price: PRICE_PER_RENT * rent, owner: None }
    }

    // Spaces without rent (Go) can never be bought
    pub fn is_ownable(&self) -> bool {
        self.rent > 0
    }
}

#[derive(Clone, Debug)]
pub struct Player {
    pub name: String,
    pub cash: i64,
    pub position: usize,
    // Board positions in the order they were bought
    pub holdings: Vec<usize>,
    pub solvent: bool,
    pub laps: usize,
}

impl Player {
    fn new(name: &str, cash: i64) -> Self {
        Player {
            name: name.to_string(),
            cash,
            position: GO,
            holdings: Vec::new(),
            solvent: true,
            laps: 0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Movement {
    pub from: usize,
    pub to: usize,
    pub passed_go: bool,
}

// What happened when a player landed on somebody else's property
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rent {
    Paid { owner: usize, amount: i64 },
    // The owner took whatever was left and the player is out
    Bankrupt { owner: usize, amount: i64 },
}

#[derive(Clone, Debug)]
pub struct State {
    pub spaces: Vec<Space>,
    pub players: Vec<Player>,
    pub go_cash: i64,
    pub dice: Dice,
    rents: Vec<i64>,
}

impl State {
    // Lay out Go and the 24 properties. Prices are always five times the rent.
    pub fn new(board: &BoardConfig, dice: Dice) -> Result<Self> {
        if board.rents.len() != BOARD_SIZE - 1 {
            bail!("Board needs {} rents, got {}", BOARD_SIZE - 1, board.rents.len());
        }
        if let Some(rent) = board.rents.iter().find(|&&rent| rent <= 0) {
            bail!("All places must charge some rent, found ${}", rent);
        }
        if let Some(rent) = board.rents.iter().find(|&&rent| rent > MAX_AMOUNT) {
            bail!("Rent of ${} is over the limit of ${}", rent, MAX_AMOUNT);
        }
        if board.go_cash < 0 {
            bail!("Passing Go can't cost money (${})", board.go_cash);
        }
        if board.go_cash > MAX_AMOUNT {
            bail!("Passing Go pays ${}, more than the limit of ${}", board.go_cash, MAX_AMOUNT);
        }

        let names = board.space_names()?;
        if names[GO] != "Go" {
            bail!("The first space must be named 'Go', not '{}'", names[GO]);
        }

        let mut seen = HashSet::new();
        for name in &names {
            if !seen.insert(name.as_str()) {
                bail!("A space named '{}' already exists", name);
            }
        }

        let spaces = names
            .into_iter()
            .enumerate()
            .map(|(position, name)| match position {
                GO => Space::go(name),
                _ => Space::property(name, position, board.rents[position - 1]),
            })
            .collect();

        Ok(State {
            spaces,
            players: Vec::new(),
            go_cash: board.go_cash,
            dice,
            rents: board.rents.clone(),
        })
    }

    pub fn min_rent(&self) -> i64 {
        self.rents.iter().copied().min().unwrap_or(0)
    }

    pub fn find_player(&self, name: &str) -> Option<usize> {
        self.players.iter().position(|p| p.name == name)
    }

    // Seat a new player on Go. Starting cash has to beat the cheapest rent or
    // the player could never buy anything.
    pub fn add_player(&mut self, name: &str, start_cash: i64) -> Result<usize> {
        if self.find_player(name).is_some() {
            bail!("Player {} already exists", name);
        }
        if self.players.len() >= MAX_PLAYERS {
            bail!("The board is full, at most {} players can play", MAX_PLAYERS);
        }
        if start_cash <= self.min_rent() {
            bail!("Starting cash ${} doesn't cover the cheapest rent of ${}", start_cash, self.min_rent());
        }
        if start_cash > MAX_AMOUNT {
            bail!("Starting cash ${} is over the limit of ${}", start_cash, MAX_AMOUNT);
        }

        self.players.push(Player::new(name, start_cash));
        Ok(self.players.len() - 1)
    }

    pub fn balance(&self, name: &str) -> Option<i64> {
        self.find_player(name).map(|i| self.players[i].cash)
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.find_player(name).map(|i| self.players[i].position)
    }

    pub fn location_name(&self, name: &str) -> Option<&str> {
        self.position(name).map(|pos| self.spaces[pos].name.as_str())
    }

    pub fn holding_names(&self, player: usize) -> Vec<String> {
        self.players[player]
            .holdings
            .iter()
            .map(|&pos| self.spaces[pos].name.clone())
            .collect()
    }

    fn active_player(&self, player: usize) -> Result<&Player> {
        let p = self.players
            .get(player)
            .ok_or_else(|| anyhow!("No player in seat {}", player))?;
        if !p.solvent {
            bail!("{} is out of the game", p.name);
        }

        Ok(p)
    }

    // Move the player around the board. Landing on or passing Go pays the lap
    // income once.
    pub fn advance(&mut self, player: usize, roll: usize) -> Result<Movement> {
        if self.players.len() < MIN_PLAYERS {
            bail!("Please wait for more players");
        }

        let current = self.active_player(player)?;
        if current.cash <= 0 {
            bail!("{} has no money and can't move", current.name);
        }
        if !self.dice.contains(roll) {
            bail!("Illegal roll of {} with {}", roll, self.dice);
        }

        let from = current.position;
        let next = from + roll;
        let passed_go = next >= BOARD_SIZE;
        let to = next % BOARD_SIZE;

        let go_cash = self.go_cash;
        let p = &mut self.players[player];
        p.position = to;
        if passed_go {
            p.cash += go_cash;
            p.laps += 1;
        }

        Ok(Movement { from, to, passed_go })
    }

    // Buy the space the player stands on. Returns false when the player can't
    // afford it; a purchase may never bring the player down to zero.
    pub fn buy_space(&mut self, player: usize) -> Result<bool> {
        let p = self.active_player(player)?;
        let cash = p.cash;
        let space = &self.spaces[p.position];

        if !space.is_ownable() {
            bail!("{} can't be bought", space.name);
        }
        if let Some(owner) = space.owner {
            bail!("{} is already owned by {}", space.name, self.players[owner].name);
        }
        if cash <= space.price {
            return Ok(false);
        }

        let (position, price) = (space.position, space.price);
        self.spaces[position].owner = Some(player);
        let p = &mut self.players[player];
        p.cash -= price;
        p.holdings.push(position);

        Ok(true)
    }

    // Collect rent for the space the player stands on. Nothing is due on Go,
    // on unowned spaces, or on the player's own property.
    pub fn charge_rent(&mut self, player: usize) -> Result<Option<Rent>> {
        let position = self.active_player(player)?.position;
        let space = &self.spaces[position];
        let owner = match space.owner {
            Some(owner) if owner != player => owner,
            _ => return Ok(None),
        };

        let rent = space.rent;
        let cash = self.players[player].cash;
        if cash > rent {
            self.players[player].cash -= rent;
            self.players[owner].cash += rent;
            return Ok(Some(Rent::Paid { owner, amount: rent }));
        }

        self.players[owner].cash += cash;
        self.players[player].cash = 0;
        self.eliminate(player)?;

        Ok(Some(Rent::Bankrupt { owner, amount: cash }))
    }

    // Take the player out of the rotation and hand their properties back to
    // the bank.
    pub fn eliminate(&mut self, player: usize) -> Result<()> {
        self.active_player(player)?;

        let holdings = std::mem::take(&mut self.players[player].holdings);
        for pos in holdings {
            self.spaces[pos].owner = None;
        }
        self.players[player].solvent = false;

        Ok(())
    }
}

impl GameState for State {
    fn active_players(&self) -> Vec<usize> {
        self.players
            .iter()
            .enumerate()
            .filter(|(_i, p)| p.solvent)
            .map(|(i, _p)| i)
            .collect()
    }

    fn is_game_over(&self) -> bool {
        self.players.len() >= MIN_PLAYERS && self.active_players().len() <= 1
    }

    fn winner(&self) -> Option<usize> {
        if !self.is_game_over() {
            return None;
        }

        self.active_players().first().copied()
    }
}

impl Validate for State {
    fn validate(&self) -> Result<()> {
        let n_players = self.players.len();
        if n_players < MIN_PLAYERS || n_players > MAX_PLAYERS {
            return Err(anyhow!("Number of players ({}) outside the bound [{}, {}]", n_players, MIN_PLAYERS, MAX_PLAYERS));
        }
        if self.spaces.len() != BOARD_SIZE {
            return Err(anyhow!("The board must have exactly {} spaces, found {}", BOARD_SIZE, self.spaces.len()));
        }
        if self.spaces[GO].name != "Go" {
            return Err(anyhow!("The first position must be named 'Go'"));
        }

        let min_rent = self.min_rent();
        for p in &self.players {
            if p.cash <= 0 {
                return Err(anyhow!("{} needs some starting cash", p.name));
            }
            if p.cash < min_rent {
                return Err(anyhow!("The board is too expensive for {} with ${}", p.name, p.cash));
            }
        }

        Ok(())
    }
}
