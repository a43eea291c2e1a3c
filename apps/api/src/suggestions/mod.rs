pub mod bullets;
