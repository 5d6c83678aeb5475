mod test_utils;
mod timer_delivery_tests;
