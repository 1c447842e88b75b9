pub mod chain_tip;
