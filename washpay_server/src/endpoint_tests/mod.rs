mod mocks;
mod orders;
mod promos;
