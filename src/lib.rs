pub mod attachment;
pub mod configuration;
pub mod dispatcher;
pub mod domain;
pub mod email_client;
pub mod recipient_list;
pub mod routes;
pub mod startup;
pub mod telemetry;
