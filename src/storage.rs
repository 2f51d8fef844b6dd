mod contacts;
mod postgres;

pub use self::{
    contacts::PgContactStore,
    postgres::{Db, migrate, new_db_pool},
};
