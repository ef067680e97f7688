pub mod carts;
pub mod catalog;
pub mod chat;
pub mod checkout;
pub mod customers;
pub mod import;
pub mod orders;
