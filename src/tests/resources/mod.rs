mod guest_tests;
mod node_tests;
