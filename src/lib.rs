// Library root
// -----------
// This crate exposes a small library surface for the admin CLI. The binary
// (`main.rs`) uses these modules to implement the interactive session.
//
// Module responsibilities:
// - `soap`: Builds request envelopes and decodes responses with the
//   generic namespace-stripped rule (local tag name -> text content).
// - `client`: Encapsulates the HTTP exchange with the directory service
//   and owns the operator session (token + role).
// - `ui`: Implements the terminal flows (login, role gate, menu) and
//   delegates every remote operation to `client`.
//
// Keeping this separation lets the client be exercised against a mock
// server without any terminal interaction.
pub mod client;
pub mod soap;
pub mod ui;
