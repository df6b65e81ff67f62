pub mod redacted;
