use gestion_client::ClientError;
use gestion_core::CoreError;
use thiserror::Error;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("{}", .0)]
    Client(#[from] ClientError),

    #[error("{}", .0)]
    Core(#[from] CoreError),
}
