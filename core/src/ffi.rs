/// Macro used to generate all the check FFI code
///
/// Expands to the C-ABI entry points the Agent loader expects from a check
/// shared library: `New`, `Run`, `Close`, `Name` and `Version`. Instances
/// created by `New` live in a process-global registry keyed by check id, so
/// state survives between `Run` calls and several instances can coexist.
#[macro_export]
macro_rules! generate_check_ffi {
    ($check_type:ty, $name:expr, $version:expr) => {
        /// Live check instances keyed by the Agent's check id
        fn check_registry()
        -> &'static std::sync::Mutex<std::collections::HashMap<String, $check_type>> {
            static REGISTRY: std::sync::OnceLock<
                std::sync::Mutex<std::collections::HashMap<String, $check_type>>,
            > = std::sync::OnceLock::new();
            REGISTRY.get_or_init(|| std::sync::Mutex::new(std::collections::HashMap::new()))
        }

        /// Hand an error message back to the Agent through the out-parameter
        fn report_check_error(error_handler: *mut *mut std::ffi::c_char, message: &str) {
            if error_handler.is_null() {
                return;
            }

            let cstr_ptr = $crate::to_cstring(message).unwrap_or(std::ptr::null_mut());

            // SAFETY: the Agent passes a valid out-parameter and takes
            // ownership of the string written into it.
            unsafe { *error_handler = cstr_ptr };
        }

        /// Instantiate the check for one configured instance
        #[allow(non_snake_case)]
        #[unsafe(no_mangle)]
        pub extern "C" fn New(
            check_id_cstr: *const std::ffi::c_char,
            init_config_cstr: *const std::ffi::c_char,
            instance_config_cstr: *const std::ffi::c_char,
            aggregator_ptr: *const $crate::Aggregator,
            error_handler: *mut *mut std::ffi::c_char,
        ) {
            if let Err(e) = create_check(
                check_id_cstr,
                init_config_cstr,
                instance_config_cstr,
                aggregator_ptr,
            ) {
                report_check_error(error_handler, &e.to_string());
            }
        }

        /// Build the check structure and store it in the registry
        fn create_check(
            check_id_cstr: *const std::ffi::c_char,
            init_config_cstr: *const std::ffi::c_char,
            instance_config_cstr: *const std::ffi::c_char,
            aggregator_ptr: *const $crate::Aggregator,
        ) -> Result<(), Box<dyn std::error::Error>> {
            // convert C args to Rust structs
            let check_id = $crate::to_rust_string(check_id_cstr)?;

            let init_config_str = $crate::to_rust_string(init_config_cstr)?;
            let init_config = $crate::Config::from_str(&init_config_str)?;

            let instance_config_str = $crate::to_rust_string(instance_config_cstr)?;
            let instance_config = $crate::Config::from_str(&instance_config_str)?;

            let aggregator = $crate::Aggregator::from_ptr(aggregator_ptr);

            let agent_check = $crate::AgentCheck::new(
                check_id.clone(),
                init_config,
                instance_config,
                aggregator,
            );

            // run the custom factory
            let check = <$check_type as $crate::Check>::new(agent_check)?;

            let mut registry = check_registry()
                .lock()
                .map_err(|_| "check registry poisoned")?;
            registry.insert(check_id, check);

            Ok(())
        }

        /// Run one collection cycle of an instance
        #[allow(non_snake_case)]
        #[unsafe(no_mangle)]
        pub extern "C" fn Run(
            check_id_cstr: *const std::ffi::c_char,
            error_handler: *mut *mut std::ffi::c_char,
        ) {
            if let Err(e) = run_check(check_id_cstr) {
                report_check_error(error_handler, &e.to_string());
            }
        }

        fn run_check(
            check_id_cstr: *const std::ffi::c_char,
        ) -> Result<(), Box<dyn std::error::Error>> {
            let check_id = $crate::to_rust_string(check_id_cstr)?;

            let mut registry = check_registry()
                .lock()
                .map_err(|_| "check registry poisoned")?;
            let check = registry
                .get_mut(&check_id)
                .ok_or_else(|| format!("unknown check instance '{check_id}'"))?;

            $crate::Check::run(check)?;

            Ok(())
        }

        /// Tear an instance down; unknown check ids are a no-op
        #[allow(non_snake_case)]
        #[unsafe(no_mangle)]
        pub extern "C" fn Close(
            check_id_cstr: *const std::ffi::c_char,
            error_handler: *mut *mut std::ffi::c_char,
        ) {
            if let Err(e) = close_check(check_id_cstr) {
                report_check_error(error_handler, &e.to_string());
            }
        }

        fn close_check(
            check_id_cstr: *const std::ffi::c_char,
        ) -> Result<(), Box<dyn std::error::Error>> {
            let check_id = $crate::to_rust_string(check_id_cstr)?;

            let removed = check_registry()
                .lock()
                .map_err(|_| "check registry poisoned")?
                .remove(&check_id);

            if let Some(mut check) = removed {
                $crate::Check::close(&mut check)?;
            }

            Ok(())
        }

        /// Get the name of the check
        #[allow(non_snake_case)]
        #[unsafe(no_mangle)]
        pub extern "C" fn Name() -> *const std::ffi::c_char {
            $name.as_ptr()
        }

        /// Get the version of the check
        #[allow(non_snake_case)]
        #[unsafe(no_mangle)]
        pub extern "C" fn Version() -> *const std::ffi::c_char {
            $version.as_ptr()
        }
    };
}
