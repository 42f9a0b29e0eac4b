pub mod resource_miner;
