pub mod keyring_secret_repository;
