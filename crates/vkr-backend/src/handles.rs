//! Opaque backend handles. `0` is the null handle, the conventional way a
//! C-shaped FFI boundary reports failure without an `Option`; these
//! Rust-facing wrappers just make "is this null" explicit.

macro_rules! backend_handle {
    ($name:ident) => {
        #[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
        pub struct $name(pub u64);

        impl $name {
            pub const NULL: $name = $name(0);

            pub fn is_null(self) -> bool {
                self.0 == 0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                $name::NULL
            }
        }
    };
}

backend_handle!(BufferHandle);
backend_handle!(TextureHandle);
backend_handle!(PipelineHandle);
backend_handle!(InstanceStateHandle);
