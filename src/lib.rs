//! tapa: replay one HTTP request across concurrent virtual users.
//!
//! The [`loadtest`] module holds the execution engine (session, worker pool,
//! pacing, expectations, result collection) together with the TOML
//! configuration, HTTP transport, statistics, and reporting layers built on
//! top of it.
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tapa::loadtest::expectation::StatusIs;
//! use tapa::loadtest::request::RequestTemplate;
//! use tapa::loadtest::session::Session;
//! use tapa::loadtest::transport::HttpTransport;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let template = RequestTemplate::get("http://localhost:8080/health")?;
//! let transport = Arc::new(HttpTransport::new(Duration::from_secs(5))?);
//!
//! let report = Session::new(template, transport)
//!     .with_users(10)
//!     .with_requests_per_user(20)
//!     .with_delay(Duration::from_millis(10), Duration::from_millis(50))
//!     .with_expectation(StatusIs::new(200))
//!     .run()
//!     .await;
//!
//! assert_eq!(report.total(), 200);
//! # Ok(())
//! # }
//! ```

pub mod loadtest;
