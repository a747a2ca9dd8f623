use crate::error::{Error, Result};
use dotenvy::dotenv;
use std::env;
use std::sync::OnceLock;

/// Hard ceiling on the number of questions in a single exam.
pub const EXAM_QUESTION_CAP: usize = 60;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub database_url: String,
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub gemini_api_base: String,
    pub generation_timeout_secs: u64,
    pub exam_min_questions: usize,
    pub exam_max_questions: usize,
    pub exam_passing_score: f64,
    pub generation_rpm: u32,
}

pub static CONFIG: OnceLock<Config> = OnceLock::new();

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let exam_max_questions: usize = get_env_parse_or("EXAM_MAX_QUESTIONS", EXAM_QUESTION_CAP)?;

        Ok(Self {
            server_address: get_env("SERVER_ADDRESS")?,
            database_url: get_env("DATABASE_URL")?,
            gemini_api_key: get_env("GEMINI_API_KEY")?,
            gemini_model: env::var("GEMINI_MODEL").unwrap_or_else(|_| "gemini-1.5-flash".to_string()),
            gemini_api_base: env::var("GEMINI_API_BASE").unwrap_or_else(|_| {
                "https://generativelanguage.googleapis.com/v1beta".to_string()
            }),
            generation_timeout_secs: get_env_parse_or("GENERATION_TIMEOUT_SECS", 120)?,
            exam_min_questions: get_env_parse_or("EXAM_MIN_QUESTIONS", 50)?,
            exam_max_questions: exam_max_questions.min(EXAM_QUESTION_CAP),
            exam_passing_score: get_env_parse_or("EXAM_PASSING_SCORE", 70.0)?,
            generation_rpm: get_env_parse_or("GENERATION_RPM", 20)?,
        })
    }
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("Missing environment variable: {}", name)))
}

fn get_env_parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e))),
        Err(_) => Ok(default),
    }
}

pub fn init_config() -> Result<()> {
    let config = Config::from_env()?;
    CONFIG
        .set(config)
        .map_err(|_| Error::Config("Configuration has already been initialized".to_string()))?;
    Ok(())
}

pub fn get_config() -> &'static Config {
    CONFIG
        .get()
        .expect("Configuration has not been initialized")
}
