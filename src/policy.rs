use std::fmt::Display;
use std::io::{BufRead, Write};
use std::ops::RangeInclusive;

use anyhow::{bail, Result};

use crate::engine::Event;
use crate::games::estate::{Player, Space};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TurnChoice {
    Roll,
    Quit,
}

// Decides for a player whenever the game needs a choice. Picked once per game.
pub trait Policy {
    fn start_turn(&mut self, player: &Player) -> Result<TurnChoice>;

    fn should_buy(&mut self, player: &Player, space: &Space) -> Result<bool>;

    // Every event of the game passes through here, in order
    fn observe(&mut self, _event: &Event) -> Result<()> {
        Ok(())
    }
}

// Always rolls and buys whatever the player can pay for
pub struct Automatic {
    narrate: bool,
}

impl Automatic {
    pub fn new(narrate: bool) -> Self {
        Automatic { narrate }
    }
}

impl Policy for Automatic {
    fn start_turn(&mut self, _player: &Player) -> Result<TurnChoice> {
        Ok(TurnChoice::Roll)
    }

    fn should_buy(&mut self, player: &Player, space: &Space) -> Result<bool> {
        Ok(player.cash >= space.price)
    }

    fn observe(&mut self, event: &Event) -> Result<()> {
        if self.narrate {
            println!("{}", event);
        }
        Ok(())
    }
}

// Line based prompts. Bad answers are asked again, closed input is an error.
pub struct Console<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Console<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Console { input, output }
    }

    pub fn say(&mut self, text: impl Display) -> Result<()> {
        writeln!(self.output, "{}", text)?;
        Ok(())
    }

    fn ask(&mut self, question: &str) -> Result<String> {
        writeln!(self.output, "{}", question)?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            bail!("Input closed while waiting for an answer to: {}", question);
        }

        Ok(line.trim().to_string())
    }

    pub fn ask_yes_no(&mut self, question: &str) -> Result<bool> {
        loop {
            match self.ask(question)?.to_lowercase().as_str() {
                "y" | "yes" => return Ok(true),
                "n" | "no" => return Ok(false),
                answer => self.say(format!("Please answer y or n, not '{}'.", answer))?,
            }
        }
    }

    pub fn ask_number(&mut self, question: &str, range: RangeInclusive<usize>) -> Result<usize> {
        loop {
            let answer = self.ask(question)?;
            match answer.parse::<usize>() {
                Ok(n) if range.contains(&n) => return Ok(n),
                Ok(n) => self.say(format!("{} is not between {} and {}.", n, range.start(), range.end()))?,
                Err(_) => self.say(format!("'{}' is not a number.", answer))?,
            }
        }
    }

    // Blank names fall back to "Player N"
    pub fn ask_names(&mut self, count: usize) -> Result<Vec<String>> {
        let mut names: Vec<String> = Vec::with_capacity(count);

        for i in 1..=count {
            let default = format!("Player {}", i);
            loop {
                let answer = self.ask(&format!("Name for player {} (blank for \"{}\"):", i, default))?;
                let name = if answer.is_empty() { default.clone() } else { answer };

                if names.contains(&name) {
                    self.say(format!("{} is already playing, pick another name.", name))?;
                    continue;
                }

                names.push(name);
                break;
            }
        }

        Ok(names)
    }
}

// Asks a human at the console for every decision
pub struct Manual<R, W> {
    console: Console<R, W>,
}

impl<R: BufRead, W: Write> Manual<R, W> {
    pub fn new(console: Console<R, W>) -> Self {
        Manual { console }
    }
}

impl<R: BufRead, W: Write> Policy for Manual<R, W> {
    fn start_turn(&mut self, _player: &Player) -> Result<TurnChoice> {
        loop {
            if self.console.ask_yes_no("Would you like to roll the dice and keep playing? (y/n)")? {
                return Ok(TurnChoice::Roll);
            }
            if self.console.ask_yes_no("Would you like to quit? (y/n)")? {
                return Ok(TurnChoice::Quit);
            }
        }
    }

    fn should_buy(&mut self, _player: &Player, space: &Space) -> Result<bool> {
        self.console.ask_yes_no(&format!("Would you like to buy {} for ${}? (y/n)", space.name, space.price))
    }

    fn observe(&mut self, event: &Event) -> Result<()> {
        self.console.say(event)
    }
}
