pub mod test_call_over_relay;
