//! Triggers CircleCI builds for a list of projects, one at a time, and
//! follows each build's workflow until it finishes.

pub mod auth;
pub mod circleci;
pub mod cli;
pub mod config;
pub mod entries;
pub mod error;
pub mod output;
pub mod runner;
