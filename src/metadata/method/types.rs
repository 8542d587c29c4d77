use bitflags::bitflags;

bitflags! {
    /// `MethodAttributes` (ECMA-335 §II.23.1.10).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MethodAttributes: u16 {
        /// Mask for the access bits.
        const MEMBER_ACCESS_MASK = 0x0007;
        /// Accessible only by the parent type.
        const PRIVATE = 0x0001;
        /// Accessible by sub-types only in this assembly.
        const FAM_AND_ASSEM = 0x0002;
        /// Accessible by anyone in the assembly.
        const ASSEM = 0x0003;
        /// Accessible only by type and sub-types.
        const FAMILY = 0x0004;
        /// Accessible by sub-types anywhere, plus anyone in the assembly.
        const FAM_OR_ASSEM = 0x0005;
        /// Accessible by anyone.
        const PUBLIC = 0x0006;
        /// Defined on the type, not per instance.
        const STATIC = 0x0010;
        /// Cannot be overridden.
        const FINAL = 0x0020;
        /// Virtual method.
        const VIRTUAL = 0x0040;
        /// Hides by name and signature.
        const HIDE_BY_SIG = 0x0080;
        /// Always gets a new vtable slot.
        const NEW_SLOT = 0x0100;
        /// Overridable only if accessible.
        const STRICT = 0x0200;
        /// No implementation provided.
        const ABSTRACT = 0x0400;
        /// Name is special.
        const SPECIAL_NAME = 0x0800;
        /// Name is special to the runtime.
        const RT_SPECIAL_NAME = 0x1000;
        /// Implementation is forwarded through P/Invoke.
        const PINVOKE_IMPL = 0x2000;
        /// Has security metadata.
        const HAS_SECURITY = 0x4000;
        /// Calls a method with security metadata.
        const REQUIRE_SEC_OBJECT = 0x8000;
    }
}

bitflags! {
    /// `MethodImplAttributes` (ECMA-335 §II.23.1.11).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MethodImplAttributes: u16 {
        /// Mask for the code type bits.
        const CODE_TYPE_MASK = 0x0003;
        /// Native code.
        const NATIVE = 0x0001;
        /// Optimized IL.
        const OPTIL = 0x0002;
        /// Provided by the runtime.
        const RUNTIME = 0x0003;
        /// Unmanaged code.
        const UNMANAGED = 0x0004;
        /// Must not be inlined.
        const NO_INLINING = 0x0008;
        /// Defined but not implemented.
        const FORWARD_REF = 0x0010;
        /// Single-threaded through the body.
        const SYNCHRONIZED = 0x0020;
        /// Must not be optimized.
        const NO_OPTIMIZATION = 0x0040;
        /// Signature is exported exactly as declared.
        const PRESERVE_SIG = 0x0080;
        /// Should be inlined if possible.
        const AGGRESSIVE_INLINING = 0x0100;
        /// Internal call.
        const INTERNAL_CALL = 0x1000;
    }
}

bitflags! {
    /// `PInvokeAttributes` of an implementation map (ECMA-335 §II.23.1.8).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PInvokeAttributes: u16 {
        /// Use the member name as specified.
        const NO_MANGLE = 0x0001;
        /// Marshal strings as ANSI.
        const CHAR_SET_ANSI = 0x0002;
        /// Marshal strings as UTF-16.
        const CHAR_SET_UNICODE = 0x0004;
        /// Let the runtime pick the charset.
        const CHAR_SET_AUTO = 0x0006;
        /// Keep the last error for `GetLastWin32Error`.
        const SUPPORTS_LAST_ERROR = 0x0040;
        /// Platform default calling convention.
        const CALL_CONV_WINAPI = 0x0100;
        /// `cdecl`.
        const CALL_CONV_CDECL = 0x0200;
        /// `stdcall`.
        const CALL_CONV_STDCALL = 0x0300;
        /// `thiscall`.
        const CALL_CONV_THISCALL = 0x0400;
        /// `fastcall`.
        const CALL_CONV_FASTCALL = 0x0500;
    }
}
