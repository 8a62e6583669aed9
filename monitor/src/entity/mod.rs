pub mod daily_usage;
