//! qpgen-web - server-rendered frontend for the question paper generator
//!
//! Forwards the broker's session cookies between the browser and the backend
//! API, and gates every page on a valid session.

pub mod api;
pub mod config;
pub mod models;
pub mod services;
pub mod theme;
