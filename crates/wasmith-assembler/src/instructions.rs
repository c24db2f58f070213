//! Fluent builder for function bodies.
//!
//! Covers the instructions most hand-assembled bodies need; anything else
//! goes through [`Instructions::raw`].  The assembler treats the result as
//! opaque bytes, so the builder does no stack or type checking.
//!
//! ```
//! use wasmith_assembler::Instructions;
//!
//! let body = Instructions::new().local_get(0).i32_const(1).i32_add().to_vec();
//! assert_eq!(body, [0x20, 0x00, 0x41, 0x01, 0x6a]);
//! ```

use wasmith_encoding::{ByteBuffer, Encode};
use wasmith_types::{ValType, END};

/// Result type of a `block`, `loop` or `if`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockType {
    Empty,
    Value(ValType),
    /// Type index of a multi-value signature.
    Func(u32),
}

impl Encode for BlockType {
    fn encode(&self, sink: &mut ByteBuffer) {
        match *self {
            Self::Empty => {
                sink.byte(0x40);
            }
            Self::Value(ty) => ty.encode(sink),
            // Signed 33-bit, so type indices never collide with value types.
            Self::Func(index) => {
                sink.i64(i64::from(index));
            }
        }
    }
}

/// Alignment exponent and static offset of a memory access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemArg {
    pub align: u32,
    pub offset: u32,
}

impl MemArg {
    pub fn new(align: u32, offset: u32) -> Self {
        Self { align, offset }
    }
}

impl Encode for MemArg {
    fn encode(&self, sink: &mut ByteBuffer) {
        sink.u32(self.align).u32(self.offset);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Instructions {
    sink: ByteBuffer,
}

impl Instructions {
    pub fn new() -> Self {
        Self::default()
    }

    fn op(&mut self, opcode: u8) -> &mut Self {
        self.sink.byte(opcode);
        self
    }

    fn op_u32(&mut self, opcode: u8, immediate: u32) -> &mut Self {
        self.sink.byte(opcode).u32(immediate);
        self
    }

    fn op_block(&mut self, opcode: u8, ty: BlockType) -> &mut Self {
        self.sink.byte(opcode);
        ty.encode(&mut self.sink);
        self
    }

    fn op_mem(&mut self, opcode: u8, arg: MemArg) -> &mut Self {
        self.sink.byte(opcode);
        arg.encode(&mut self.sink);
        self
    }

    /// Append pre-encoded instruction bytes.
    pub fn raw(&mut self, bytes: &[u8]) -> &mut Self {
        self.sink.bytes(bytes);
        self
    }

    // ── Control ──────────────────────────────────────────────────────────

    pub fn unreachable(&mut self) -> &mut Self {
        self.op(0x00)
    }

    pub fn nop(&mut self) -> &mut Self {
        self.op(0x01)
    }

    pub fn block(&mut self, ty: BlockType) -> &mut Self {
        self.op_block(0x02, ty)
    }

    pub fn loop_(&mut self, ty: BlockType) -> &mut Self {
        self.op_block(0x03, ty)
    }

    pub fn if_(&mut self, ty: BlockType) -> &mut Self {
        self.op_block(0x04, ty)
    }

    pub fn else_(&mut self) -> &mut Self {
        self.op(0x05)
    }

    /// Close a `block`, `loop` or `if`.  The function body's own `end` is
    /// appended by the assembler.
    pub fn end(&mut self) -> &mut Self {
        self.op(END)
    }

    pub fn br(&mut self, depth: u32) -> &mut Self {
        self.op_u32(0x0c, depth)
    }

    pub fn br_if(&mut self, depth: u32) -> &mut Self {
        self.op_u32(0x0d, depth)
    }

    pub fn return_(&mut self) -> &mut Self {
        self.op(0x0f)
    }

    pub fn call(&mut self, function: u32) -> &mut Self {
        self.op_u32(0x10, function)
    }

    pub fn drop(&mut self) -> &mut Self {
        self.op(0x1a)
    }

    pub fn select(&mut self) -> &mut Self {
        self.op(0x1b)
    }

    // ── Variables ────────────────────────────────────────────────────────

    pub fn local_get(&mut self, local: u32) -> &mut Self {
        self.op_u32(0x20, local)
    }

    pub fn local_set(&mut self, local: u32) -> &mut Self {
        self.op_u32(0x21, local)
    }

    pub fn local_tee(&mut self, local: u32) -> &mut Self {
        self.op_u32(0x22, local)
    }

    pub fn global_get(&mut self, global: u32) -> &mut Self {
        self.op_u32(0x23, global)
    }

    pub fn global_set(&mut self, global: u32) -> &mut Self {
        self.op_u32(0x24, global)
    }

    // ── Memory ───────────────────────────────────────────────────────────

    pub fn i32_load(&mut self, arg: MemArg) -> &mut Self {
        self.op_mem(0x28, arg)
    }

    pub fn i64_load(&mut self, arg: MemArg) -> &mut Self {
        self.op_mem(0x29, arg)
    }

    pub fn i32_load8_u(&mut self, arg: MemArg) -> &mut Self {
        self.op_mem(0x2d, arg)
    }

    pub fn i32_store(&mut self, arg: MemArg) -> &mut Self {
        self.op_mem(0x36, arg)
    }

    pub fn i64_store(&mut self, arg: MemArg) -> &mut Self {
        self.op_mem(0x37, arg)
    }

    pub fn i32_store8(&mut self, arg: MemArg) -> &mut Self {
        self.op_mem(0x3a, arg)
    }

    pub fn memory_size(&mut self) -> &mut Self {
        self.sink.byte(0x3f).byte(0x00);
        self
    }

    pub fn memory_grow(&mut self) -> &mut Self {
        self.sink.byte(0x40).byte(0x00);
        self
    }

    // ── Constants ────────────────────────────────────────────────────────

    pub fn i32_const(&mut self, value: i32) -> &mut Self {
        self.sink.byte(0x41).i32(value);
        self
    }

    pub fn i64_const(&mut self, value: i64) -> &mut Self {
        self.sink.byte(0x42).i64(value);
        self
    }

    pub fn f32_const(&mut self, value: f32) -> &mut Self {
        self.sink.byte(0x43).f32(value);
        self
    }

    pub fn f64_const(&mut self, value: f64) -> &mut Self {
        self.sink.byte(0x44).f64(value);
        self
    }

    // ── Numeric ──────────────────────────────────────────────────────────

    pub fn i32_eqz(&mut self) -> &mut Self {
        self.op(0x45)
    }

    pub fn i32_eq(&mut self) -> &mut Self {
        self.op(0x46)
    }

    pub fn i32_ne(&mut self) -> &mut Self {
        self.op(0x47)
    }

    pub fn i32_lt_s(&mut self) -> &mut Self {
        self.op(0x48)
    }

    pub fn i32_gt_s(&mut self) -> &mut Self {
        self.op(0x4a)
    }

    pub fn i32_add(&mut self) -> &mut Self {
        self.op(0x6a)
    }

    pub fn i32_sub(&mut self) -> &mut Self {
        self.op(0x6b)
    }

    pub fn i32_mul(&mut self) -> &mut Self {
        self.op(0x6c)
    }

    pub fn i64_add(&mut self) -> &mut Self {
        self.op(0x7c)
    }

    pub fn i64_mul(&mut self) -> &mut Self {
        self.op(0x7e)
    }

    pub fn f64_add(&mut self) -> &mut Self {
        self.op(0xa0)
    }

    pub fn i64_extend_i32_u(&mut self) -> &mut Self {
        self.op(0xad)
    }

    // ── Output ───────────────────────────────────────────────────────────

    pub fn len(&self) -> usize {
        self.sink.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sink.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        self.sink.as_slice()
    }

    /// Copy out the encoded instructions, leaving the builder reusable.
    pub fn to_vec(&self) -> Vec<u8> {
        self.sink.as_slice().to_vec()
    }
}

impl From<Instructions> for Vec<u8> {
    fn from(instructions: Instructions) -> Self {
        instructions.sink.finish()
    }
}
