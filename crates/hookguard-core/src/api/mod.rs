pub mod whitelist;
