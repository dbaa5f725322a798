pub mod machine_learning;
pub mod rendezvous;
pub mod worker;
