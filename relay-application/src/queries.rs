pub mod channel_queries;
