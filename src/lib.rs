// Library surface for the binary and for headless integration tests.
pub mod app;
pub mod app_dirs;
pub mod controller;
pub mod phrasebook;
pub mod question;
pub mod render;
pub mod runtime;
pub mod settings;
pub mod speech;
pub mod ui;
