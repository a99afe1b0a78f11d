//! # Repositories
//!
//! One repository per aggregate:
//!
//! - [`product`] - catalog CRUD, search, restock, the atomic decrement
//! - [`user`] - staff/administrator records
//! - [`transaction`] - committed transactions and their sale lines
//!   (read side; writes happen only inside the checkout engine)

pub mod product;
pub mod transaction;
pub mod user;
