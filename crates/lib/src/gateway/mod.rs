//! Gateway: HTTP server for the WhatsApp webhook.
//!
//! `GET /webhook` answers the subscription handshake, `POST /webhook` receives events and
//! acknowledges them immediately while each event is processed on its own task.

mod server;

pub use server::{router, run_gateway, GatewayState};
