mod renderer_mock;

// This file organizes the integration tests into a cohesive test suite.
// Each module tests a specific aspect of the application:
// - smoke_tests: Calendar lifecycle, navigation and filtering through the handle
// - renderer_mock: A recording renderer to check what the calendar asks it to draw
// - store_scope_tests: Session and local persistence of the view state
