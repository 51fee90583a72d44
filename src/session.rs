//! Command dispatch for the interactive controller.
//!
//! A [`Session`] owns every configured course plus the grade source used to
//! populate them. Each course command first makes sure the course has been
//! retrieved, then applies the requested what-if operation and renders the
//! result.

use anyhow::{Context, Result, anyhow, bail};
use indexmap::IndexMap;
use std::str::FromStr;
use tracing::debug;

use crate::gradebook::course::Course;
use crate::gradebook::drop::DropStrategy;
use crate::output::{render_course, render_final_needed, render_removed};
use crate::source::GradeSource;

/// Usage lines shown by `help`.
pub const COMMANDS: &[(&str, &str)] = &[
    ("show <course>", "show category scores and the overall grade"),
    ("all", "show every course"),
    ("add <course> <category> <got> <possible>", "add a what-if assignment"),
    ("drop <course> <category> <n>", "drop the n assignments that hurt most"),
    ("final <course> <desired>", "score needed on the final for a target grade"),
    ("refresh <course>", "fetch grades again, discarding what-if edits"),
    ("help", "list commands and courses"),
    ("exit", "quit"),
];

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Show {
        course: String,
    },
    All,
    Add {
        course: String,
        category: String,
        points_got: f64,
        points_possible: f64,
    },
    Drop {
        course: String,
        category: String,
        how_many: usize,
    },
    Final {
        course: String,
        desired_score: f64,
    },
    Refresh {
        course: String,
    },
    Help,
    Exit,
}

fn parse_number<T: FromStr>(value: &str, what: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| anyhow!("{what} must be a number, got '{value}'"))
}

impl FromStr for Command {
    type Err = anyhow::Error;

    fn from_str(line: &str) -> Result<Self> {
        let words: Vec<&str> = line.split_whitespace().collect();
        let command = match words.as_slice() {
            ["show", course] => Command::Show {
                course: course.to_string(),
            },
            ["all"] => Command::All,
            ["add", course, category, got, possible] => Command::Add {
                course: course.to_string(),
                category: category.to_string(),
                points_got: parse_number(got, "score")?,
                points_possible: parse_number(possible, "out of")?,
            },
            ["drop", course, category, n] => Command::Drop {
                course: course.to_string(),
                category: category.to_string(),
                how_many: parse_number(n, "how many")?,
            },
            ["final", course, desired] => Command::Final {
                course: course.to_string(),
                desired_score: parse_number(desired, "desired score")?,
            },
            ["refresh", course] => Command::Refresh {
                course: course.to_string(),
            },
            ["help"] => Command::Help,
            ["exit"] | ["quit"] => Command::Exit,
            [] => bail!("empty command, try 'help'"),
            [name, ..] => bail!("unrecognized command '{name}', try 'help'"),
        };
        Ok(command)
    }
}

/// Result of executing one command.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Text(String),
    Exit,
}

pub struct Session {
    courses: IndexMap<String, Course>,
    source: Box<dyn GradeSource>,
    strategy: DropStrategy,
}

impl Session {
    pub fn new(courses: IndexMap<String, Course>, source: Box<dyn GradeSource>) -> Self {
        Self {
            courses,
            source,
            strategy: DropStrategy::Greedy,
        }
    }

    pub fn with_drop_strategy(mut self, strategy: DropStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn courses(&self) -> &IndexMap<String, Course> {
        &self.courses
    }

    pub fn course(&self, key: &str) -> Option<&Course> {
        self.courses.get(key)
    }

    /// Looks up `key` and makes sure its grades have been fetched.
    async fn retrieved_course(&mut self, key: &str) -> Result<&mut Course> {
        let course = self.courses.get_mut(key).ok_or_else(|| {
            anyhow!("unknown course '{key}', try 'help' to list courses")
        })?;
        course.get_grades(&self.source).await?;
        Ok(course)
    }

    pub async fn execute(&mut self, command: Command) -> Result<Reply> {
        debug!(?command, "Executing command");

        let text = match command {
            Command::Show { course } => render_course(self.retrieved_course(&course).await?),
            Command::All => {
                let keys: Vec<String> = self.courses.keys().cloned().collect();
                let mut text = String::new();
                for key in keys {
                    text.push_str(&render_course(self.retrieved_course(&key).await?));
                    text.push('\n');
                }
                text
            }
            Command::Add {
                course,
                category,
                points_got,
                points_possible,
            } => {
                let course = self.retrieved_course(&course).await?;
                course.add_and_update(&category, points_got, points_possible)?;
                render_course(course)
            }
            Command::Drop {
                course,
                category,
                how_many,
            } => {
                let strategy = self.strategy;
                let course = self.retrieved_course(&course).await?;
                let removed = course.drop_with(&category, how_many, strategy)?;
                let mut text = render_removed(&removed);
                text.push_str(&render_course(course));
                text
            }
            Command::Final {
                course,
                desired_score,
            } => {
                let course = self.retrieved_course(&course).await?;
                let needed = course
                    .calculate_final_needed(desired_score)
                    .with_context(|| format!("cannot project final for '{}'", course.key()))?;
                render_final_needed(desired_score, needed)
            }
            Command::Refresh { course } => {
                if let Some(c) = self.courses.get_mut(&course) {
                    c.set_retrieved(false);
                }
                render_course(self.retrieved_course(&course).await?)
            }
            Command::Help => self.help(),
            Command::Exit => return Ok(Reply::Exit),
        };

        Ok(Reply::Text(text))
    }

    fn help(&self) -> String {
        let mut text = String::from("Commands:\n");
        for (usage, description) in COMMANDS {
            text.push_str(&format!("  {usage:42} {description}\n"));
        }
        let keys: Vec<&str> = self.courses.keys().map(String::as_str).collect();
        text.push_str(&format!("Courses: {}\n", keys.join(", ")));
        text
    }
}
